//! Name tables used by the rewriter

/// Package roots whose qualifiers are dropped (`java.util.UUID` -> `UUID`)
pub(super) const PACKAGE_ROOTS: &[&str] = &["java", "javax", "groovy", "com", "org", "net"];

/// Lower-case type keywords that can start a typed declaration
pub(super) const PRIMITIVE_TYPES: &[&str] = &[
    "int", "long", "short", "byte", "double", "float", "boolean", "char",
];

/// Sandbox function for a closure-taking collection method
///
/// Two-parameter closures over maps receive `(key, value)` and use the
/// `_pair` variants; one-parameter closures receive an entry.
pub(super) fn closure_method(name: &str, arity: usize) -> Option<&'static str> {
    let pair = arity == 2;
    let mapped = match name {
        "each" if pair => "for_each_pair",
        "each" => "for_each",
        "eachWithIndex" => "for_each_indexed",
        "collect" if pair => "map_pair",
        "collect" => "map",
        "findAll" if pair => "filter_pair",
        "findAll" => "filter",
        "find" if pair => "find_pair",
        "find" => "find",
        "any" if pair => "any_pair",
        "any" => "any",
        "every" if pair => "every_pair",
        "every" => "every",
        "collectEntries" if pair => "collect_entries_pair",
        "collectEntries" => "collect_entries",
        "inject" => "inject",
        "sort" if pair => "sort_with",
        "sort" => "sort_by_key",
        "sum" => "sum_by",
        "groupBy" => "group_by",
        "count" => "count_by",
        "max" => "max_by",
        "min" => "min_by",
        _ => return None,
    };
    Some(mapped)
}

/// Conversion call replacing `as <Type>`; `None` drops the cast
pub(super) fn cast_conversion(type_name: &str) -> Option<&'static str> {
    match type_name {
        "String" => Some(".toString()"),
        "Integer" | "int" | "Long" | "long" | "Short" | "short" | "BigInteger" => {
            Some(".toInteger()")
        }
        "Double" | "double" | "Float" | "float" | "BigDecimal" | "Number" => Some(".toDouble()"),
        "Boolean" | "boolean" => Some(".toBoolean()"),
        _ => None,
    }
}

/// Whether `word` can name a type in a declaration
pub(super) fn is_type_name(word: &str) -> bool {
    PRIMITIVE_TYPES.contains(&word) || word.chars().next().is_some_and(char::is_uppercase)
}

/// Strip Groovy numeric type suffixes; float suffixes on integers gain `.0`
pub(super) fn number_literal(text: &str) -> String {
    let hex = text.starts_with("0x") || text.starts_with("0X");
    let Some(last) = text.chars().last() else {
        return String::new();
    };
    let suffix = if hex {
        matches!(last, 'l' | 'L')
    } else {
        "lLgGdDfFiI".contains(last)
    };
    if !suffix {
        return text.to_string();
    }
    let digits = &text[..text.len() - 1];
    let float_suffix = matches!(last, 'd' | 'D' | 'f' | 'F');
    if float_suffix && !hex && !digits.contains(['.', 'e', 'E']) {
        format!("{}.0", digits)
    } else {
        digits.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_method_by_arity() {
        assert_eq!(closure_method("each", 1), Some("for_each"));
        assert_eq!(closure_method("each", 2), Some("for_each_pair"));
        assert_eq!(closure_method("findAll", 1), Some("filter"));
        assert_eq!(closure_method("inject", 2), Some("inject"));
        assert_eq!(closure_method("frobnicate", 1), None);
    }

    #[test]
    fn test_number_suffixes() {
        assert_eq!(number_literal("10L"), "10");
        assert_eq!(number_literal("1.5d"), "1.5");
        assert_eq!(number_literal("2f"), "2.0");
        assert_eq!(number_literal("100G"), "100");
        assert_eq!(number_literal("0xFF"), "0xFF");
        assert_eq!(number_literal("0x1FL"), "0x1F");
        assert_eq!(number_literal("42"), "42");
    }

    #[test]
    fn test_type_names() {
        assert!(is_type_name("String"));
        assert!(is_type_name("int"));
        assert!(!is_type_name("message"));
    }
}
