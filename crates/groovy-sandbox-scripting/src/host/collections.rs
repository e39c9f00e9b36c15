//! Groovy collection methods over arrays and object maps
//!
//! Closure-taking methods are registered under the names the rewriter maps
//! them to (`each` -> `for_each`, `findAll` -> `filter`, ...). Maps iterate
//! entries as `{key, value}` maps, or `(key, value)` pairs for the `_pair`
//! variants.

use super::value::{
    as_number, compare, display, entry, is_truthy, runtime_error, values_equal, RhaiResult,
};
use rhai::{Array, Dynamic, Engine, FnPtr, Map, NativeCallContext, INT};
use std::cmp::Ordering;

fn call1(ctx: &NativeCallContext<'_>, f: &FnPtr, a: Dynamic) -> RhaiResult<Dynamic> {
    f.call_within_context(ctx, (a,))
}

fn call2(ctx: &NativeCallContext<'_>, f: &FnPtr, a: Dynamic, b: Dynamic) -> RhaiResult<Dynamic> {
    f.call_within_context(ctx, (a, b))
}

/// Groovy `+` for `sum` and `inject`-style folds
fn add(a: &Dynamic, b: &Dynamic) -> RhaiResult<Dynamic> {
    if a.is_unit() {
        return Ok(b.clone());
    }
    if let (Ok(x), Ok(y)) = (a.as_int(), b.as_int()) {
        return match x.checked_add(y) {
            Some(sum) => Ok(sum.into()),
            None => runtime_error("integer overflow in sum"),
        };
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return Ok((x + y).into());
    }
    if a.is_string() {
        return Ok(format!("{}{}", display(a), display(b)).into());
    }
    runtime_error(format!(
        "cannot add {} and {}",
        a.type_name(),
        b.type_name()
    ))
}

/// Hand `item` to `call` as a shared value so in-place edits stick (`each { it.x = 1 }`)
fn visit(
    item: &mut Dynamic,
    call: impl FnOnce(Dynamic) -> RhaiResult<Dynamic>,
) -> RhaiResult<()> {
    let shared = std::mem::take(item).into_shared();
    let outcome = call(shared.clone());
    *item = shared.flatten();
    outcome.map(|_| ())
}

fn extreme(items: &[Dynamic], keys: &[Dynamic], wanted: Ordering) -> Dynamic {
    let mut best: Option<usize> = None;
    for i in 0..items.len() {
        best = match best {
            Some(b) if compare(&keys[i], &keys[b]) != wanted => Some(b),
            _ => Some(i),
        };
    }
    best.map_or(Dynamic::UNIT, |b| items[b].clone())
}

fn entries(map: &Map) -> Array {
    map.iter().map(|(k, v)| entry(k, v.clone())).collect()
}

/// Merge a closure result into a map being built by `collectEntries`
fn merge_entry(out: &mut Map, produced: Dynamic) -> RhaiResult<()> {
    if let Some(pair) = produced.read_lock::<Array>() {
        if pair.len() == 2 {
            out.insert(display(&pair[0]).into(), pair[1].clone());
            return Ok(());
        }
    }
    if let Some(map) = produced.read_lock::<Map>() {
        if let (Some(k), Some(v)) = (map.get("key"), map.get("value")) {
            if map.len() == 2 {
                out.insert(display(k).into(), v.clone());
                return Ok(());
            }
        }
        out.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
        return Ok(());
    }
    runtime_error("collectEntries closure must return a [key, value] pair or a map")
}

fn register_array_closures(engine: &mut Engine) {
    engine
        .register_fn(
            "for_each",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<()> {
                for item in items.iter_mut() {
                    visit(item, |shared| call1(&ctx, &f, shared))?;
                }
                Ok(())
            },
        )
        .register_fn(
            "for_each_indexed",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<()> {
                for (i, item) in items.iter_mut().enumerate() {
                    visit(item, |shared| call2(&ctx, &f, shared, (i as INT).into()))?;
                }
                Ok(())
            },
        )
        .register_fn(
            "map",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<Array> {
                items.iter().map(|item| call1(&ctx, &f, item.clone())).collect()
            },
        )
        .register_fn(
            "filter",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<Array> {
                let mut kept = Array::new();
                for item in items.iter() {
                    if is_truthy(&call1(&ctx, &f, item.clone())?) {
                        kept.push(item.clone());
                    }
                }
                Ok(kept)
            },
        )
        .register_fn(
            "find",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<Dynamic> {
                for item in items.iter() {
                    if is_truthy(&call1(&ctx, &f, item.clone())?) {
                        return Ok(item.clone());
                    }
                }
                Ok(Dynamic::UNIT)
            },
        )
        .register_fn(
            "any",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<bool> {
                for item in items.iter() {
                    if is_truthy(&call1(&ctx, &f, item.clone())?) {
                        return Ok(true);
                    }
                }
                Ok(false)
            },
        )
        .register_fn(
            "every",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<bool> {
                for item in items.iter() {
                    if !is_truthy(&call1(&ctx, &f, item.clone())?) {
                        return Ok(false);
                    }
                }
                Ok(true)
            },
        )
        .register_fn(
            "collect_entries",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<Map> {
                let mut out = Map::new();
                for item in items.iter() {
                    merge_entry(&mut out, call1(&ctx, &f, item.clone())?)?;
                }
                Ok(out)
            },
        )
        .register_fn(
            "inject",
            |ctx: NativeCallContext<'_>, items: &mut Array, init: Dynamic, f: FnPtr| {
                items
                    .iter()
                    .try_fold(init, |acc, item| call2(&ctx, &f, acc, item.clone()))
            },
        )
        .register_fn(
            "inject",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<Dynamic> {
                let mut iter = items.iter();
                let Some(first) = iter.next() else {
                    return Ok(Dynamic::UNIT);
                };
                iter.try_fold(first.clone(), |acc, item| call2(&ctx, &f, acc, item.clone()))
            },
        )
        .register_fn(
            "sort_by_key",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<Array> {
                let keys = items
                    .iter()
                    .map(|item| call1(&ctx, &f, item.clone()))
                    .collect::<RhaiResult<Vec<_>>>()?;
                let mut order: Vec<usize> = (0..items.len()).collect();
                order.sort_by(|&a, &b| compare(&keys[a], &keys[b]));
                let sorted: Array = order.into_iter().map(|i| items[i].clone()).collect();
                *items = sorted.clone();
                Ok(sorted)
            },
        )
        .register_fn(
            "sort_with",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<Array> {
                let mut failure = None;
                let mut sorted = items.clone();
                sorted.sort_by(|a, b| {
                    if failure.is_some() {
                        return Ordering::Equal;
                    }
                    match call2(&ctx, &f, a.clone(), b.clone()).map(|r| r.as_int()) {
                        Ok(Ok(n)) => n.cmp(&0),
                        Ok(Err(type_name)) => {
                            failure = Some(format!("comparator returned {}", type_name));
                            Ordering::Equal
                        }
                        Err(e) => {
                            failure = Some(e.to_string());
                            Ordering::Equal
                        }
                    }
                });
                if let Some(message) = failure {
                    return runtime_error(message);
                }
                *items = sorted.clone();
                Ok(sorted)
            },
        )
        .register_fn(
            "sum_by",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<Dynamic> {
                let mut total = Dynamic::UNIT;
                for item in items.iter() {
                    total = add(&total, &call1(&ctx, &f, item.clone())?)?;
                }
                Ok(if total.is_unit() { Dynamic::from(0 as INT) } else { total })
            },
        )
        .register_fn(
            "group_by",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<Map> {
                let mut groups = Map::new();
                for item in items.iter() {
                    let key = display(&call1(&ctx, &f, item.clone())?);
                    let slot = groups
                        .entry(key.into())
                        .or_insert_with(|| Dynamic::from_array(Array::new()));
                    if let Some(mut group) = slot.write_lock::<Array>() {
                        group.push(item.clone());
                    }
                }
                Ok(groups)
            },
        )
        .register_fn(
            "count_by",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<INT> {
                let mut n = 0;
                for item in items.iter() {
                    if is_truthy(&call1(&ctx, &f, item.clone())?) {
                        n += 1;
                    }
                }
                Ok(n)
            },
        )
        .register_fn(
            "max_by",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<Dynamic> {
                let keys = items
                    .iter()
                    .map(|item| call1(&ctx, &f, item.clone()))
                    .collect::<RhaiResult<Vec<_>>>()?;
                Ok(extreme(items, &keys, Ordering::Greater))
            },
        )
        .register_fn(
            "min_by",
            |ctx: NativeCallContext<'_>, items: &mut Array, f: FnPtr| -> RhaiResult<Dynamic> {
                let keys = items
                    .iter()
                    .map(|item| call1(&ctx, &f, item.clone()))
                    .collect::<RhaiResult<Vec<_>>>()?;
                Ok(extreme(items, &keys, Ordering::Less))
            },
        );
}

fn register_array_helpers(engine: &mut Engine) {
    engine
        .register_fn("size", |items: &mut Array| items.len() as INT)
        .register_fn("isEmpty", |items: &mut Array| items.is_empty())
        .register_fn("first", |items: &mut Array| {
            items.first().cloned().unwrap_or(Dynamic::UNIT)
        })
        .register_fn("last", |items: &mut Array| {
            items.last().cloned().unwrap_or(Dynamic::UNIT)
        })
        .register_fn("get", |items: &mut Array, i: INT| {
            usize::try_from(i)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Dynamic::UNIT)
        })
        .register_fn("add", |items: &mut Array, item: Dynamic| {
            items.push(item);
            true
        })
        .register_fn("leftShift", |items: &mut Array, item: Dynamic| {
            items.push(item);
            items.clone()
        })
        .register_fn("contains", |items: &mut Array, item: Dynamic| {
            items.iter().any(|x| values_equal(x, &item))
        })
        .register_fn("count", |items: &mut Array, item: Dynamic| {
            items.iter().filter(|x| values_equal(x, &item)).count() as INT
        })
        .register_fn("unique", |items: &mut Array| {
            let mut seen = Array::new();
            for item in items.iter() {
                if !seen.iter().any(|x| values_equal(x, item)) {
                    seen.push(item.clone());
                }
            }
            *items = seen.clone();
            seen
        })
        .register_fn("sort", |items: &mut Array| {
            items.sort_by(compare);
            items.clone()
        })
        .register_fn("sum", |items: &mut Array| -> RhaiResult<Dynamic> {
            let mut total = Dynamic::UNIT;
            for item in items.iter() {
                total = add(&total, item)?;
            }
            Ok(if total.is_unit() { Dynamic::from(0 as INT) } else { total })
        })
        .register_fn("max", |items: &mut Array| {
            extreme(items, &items.clone(), Ordering::Greater)
        })
        .register_fn("min", |items: &mut Array| {
            extreme(items, &items.clone(), Ordering::Less)
        })
        .register_fn("join", |items: &mut Array, sep: &str| {
            items.iter().map(display).collect::<Vec<_>>().join(sep)
        })
        .register_fn("join", |items: &mut Array| {
            items.iter().map(display).collect::<String>()
        })
        .register_fn("flatten", |items: &mut Array| {
            fn flatten_into(out: &mut Array, items: &Array) {
                for item in items {
                    match item.read_lock::<Array>() {
                        Some(inner) => flatten_into(out, &inner),
                        None => out.push(item.clone()),
                    }
                }
            }
            let mut out = Array::new();
            flatten_into(&mut out, items);
            out
        });
}

fn register_map_closures(engine: &mut Engine) {
    engine
        .register_fn(
            "for_each",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<()> {
                for e in entries(map) {
                    let _ = call1(&ctx, &f, e)?;
                }
                Ok(())
            },
        )
        .register_fn(
            "for_each_pair",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<()> {
                for (k, v) in map.iter() {
                    let _ = call2(&ctx, &f, k.as_str().into(), v.clone())?;
                }
                Ok(())
            },
        )
        .register_fn(
            "for_each_indexed",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<()> {
                for (i, e) in entries(map).into_iter().enumerate() {
                    let _ = call2(&ctx, &f, e, (i as INT).into())?;
                }
                Ok(())
            },
        )
        .register_fn(
            "map",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<Array> {
                entries(map).into_iter().map(|e| call1(&ctx, &f, e)).collect()
            },
        )
        .register_fn(
            "map_pair",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<Array> {
                map.iter()
                    .map(|(k, v)| call2(&ctx, &f, k.as_str().into(), v.clone()))
                    .collect()
            },
        )
        .register_fn(
            "filter",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<Map> {
                let mut kept = Map::new();
                for (k, v) in map.iter() {
                    if is_truthy(&call1(&ctx, &f, entry(k, v.clone()))?) {
                        kept.insert(k.clone(), v.clone());
                    }
                }
                Ok(kept)
            },
        )
        .register_fn(
            "filter_pair",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<Map> {
                let mut kept = Map::new();
                for (k, v) in map.iter() {
                    if is_truthy(&call2(&ctx, &f, k.as_str().into(), v.clone())?) {
                        kept.insert(k.clone(), v.clone());
                    }
                }
                Ok(kept)
            },
        )
        .register_fn(
            "find",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<Dynamic> {
                for e in entries(map) {
                    if is_truthy(&call1(&ctx, &f, e.clone())?) {
                        return Ok(e);
                    }
                }
                Ok(Dynamic::UNIT)
            },
        )
        .register_fn(
            "find_pair",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<Dynamic> {
                for (k, v) in map.iter() {
                    if is_truthy(&call2(&ctx, &f, k.as_str().into(), v.clone())?) {
                        return Ok(entry(k, v.clone()));
                    }
                }
                Ok(Dynamic::UNIT)
            },
        )
        .register_fn(
            "any",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<bool> {
                for e in entries(map) {
                    if is_truthy(&call1(&ctx, &f, e)?) {
                        return Ok(true);
                    }
                }
                Ok(false)
            },
        )
        .register_fn(
            "any_pair",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<bool> {
                for (k, v) in map.iter() {
                    if is_truthy(&call2(&ctx, &f, k.as_str().into(), v.clone())?) {
                        return Ok(true);
                    }
                }
                Ok(false)
            },
        )
        .register_fn(
            "every",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<bool> {
                for e in entries(map) {
                    if !is_truthy(&call1(&ctx, &f, e)?) {
                        return Ok(false);
                    }
                }
                Ok(true)
            },
        )
        .register_fn(
            "every_pair",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<bool> {
                for (k, v) in map.iter() {
                    if !is_truthy(&call2(&ctx, &f, k.as_str().into(), v.clone())?) {
                        return Ok(false);
                    }
                }
                Ok(true)
            },
        )
        .register_fn(
            "collect_entries",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<Map> {
                let mut out = Map::new();
                for e in entries(map) {
                    merge_entry(&mut out, call1(&ctx, &f, e)?)?;
                }
                Ok(out)
            },
        )
        .register_fn(
            "collect_entries_pair",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<Map> {
                let mut out = Map::new();
                for (k, v) in map.iter() {
                    merge_entry(&mut out, call2(&ctx, &f, k.as_str().into(), v.clone())?)?;
                }
                Ok(out)
            },
        )
        .register_fn(
            "inject",
            |ctx: NativeCallContext<'_>, map: &mut Map, init: Dynamic, f: FnPtr| {
                entries(map)
                    .into_iter()
                    .try_fold(init, |acc, e| call2(&ctx, &f, acc, e))
            },
        )
        .register_fn(
            "count_by",
            |ctx: NativeCallContext<'_>, map: &mut Map, f: FnPtr| -> RhaiResult<INT> {
                let mut n = 0;
                for e in entries(map) {
                    if is_truthy(&call1(&ctx, &f, e)?) {
                        n += 1;
                    }
                }
                Ok(n)
            },
        );
}

fn register_map_helpers(engine: &mut Engine) {
    engine
        .register_fn("size", |map: &mut Map| map.len() as INT)
        .register_fn("isEmpty", |map: &mut Map| map.is_empty())
        .register_fn("keySet", |map: &mut Map| {
            map.keys().map(|k| Dynamic::from(k.to_string())).collect::<Array>()
        })
        .register_fn("values", |map: &mut Map| map.values().cloned().collect::<Array>())
        .register_fn("entrySet", |map: &mut Map| entries(map))
        .register_fn("containsKey", |map: &mut Map, key: Dynamic| {
            map.contains_key(display(&key).as_str())
        })
        .register_fn("get", |map: &mut Map, key: Dynamic| {
            map.get(display(&key).as_str()).cloned().unwrap_or(Dynamic::UNIT)
        })
        .register_fn("getOrDefault", |map: &mut Map, key: Dynamic, fallback: Dynamic| {
            map.get(display(&key).as_str()).cloned().unwrap_or(fallback)
        })
        .register_fn("put", |map: &mut Map, key: Dynamic, value: Dynamic| {
            map.insert(display(&key).into(), value)
                .unwrap_or(Dynamic::UNIT)
        })
        .register_fn("putAll", |map: &mut Map, other: Map| map.extend(other))
        .register_fn("leftShift", |map: &mut Map, other: Map| {
            map.extend(other);
            map.clone()
        });
}

/// `key` and `value` of an entry map, for scripts that iterate `entrySet()`
fn register_entry_accessors(engine: &mut Engine) {
    engine
        .register_fn("getKey", |e: &mut Map| {
            e.get("key").cloned().unwrap_or(Dynamic::UNIT)
        })
        .register_fn("getValue", |e: &mut Map| {
            e.get("value").cloned().unwrap_or(Dynamic::UNIT)
        });
}

pub(crate) fn register(engine: &mut Engine) {
    register_array_closures(engine);
    register_array_helpers(engine);
    register_map_closures(engine);
    register_map_helpers(engine);
    register_entry_accessors(engine);
}
