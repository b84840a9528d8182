//! Built-in methods of `list`, `dict` and `str`
//!
//! Attribute access on one of these values yields a [`BoundMethod`]; calling it
//! dispatches here by receiver type and method name. Mutating methods work on
//! the shared container, so every alias observes the change.

use crate::interpreter::builtins::{check_arity, expect_int, reject_keywords};
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{ExceptionKind, ScriptError};
use crate::memory::value::{BoundMethod, Dict, Value};
use crate::parser::ast::SourceLocation;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

const LIST_METHODS: &[&str] = &[
    "append", "pop", "insert", "extend", "remove", "index", "count", "sort", "reverse", "clear",
    "copy",
];

const DICT_METHODS: &[&str] = &[
    "get", "keys", "values", "items", "pop", "setdefault", "update", "clear", "copy",
];

const STR_METHODS: &[&str] = &[
    "upper", "lower", "strip", "lstrip", "rstrip", "split", "join", "replace", "startswith",
    "endswith", "find", "count", "isdigit", "isalpha",
];

/// Strip characters from one or both ends of `text`
fn strip<'a>(text: &'a str, chars: Option<&str>, leading: bool, trailing: bool) -> &'a str {
    let matches = |c: char| match chars {
        Some(set) => set.contains(c),
        None => c.is_whitespace(),
    };
    let text = if leading { text.trim_start_matches(matches) } else { text };
    if trailing {
        text.trim_end_matches(matches)
    } else {
        text
    }
}

/// A `str` argument of a string method
fn string_arg(args: &[Value], index: usize, location: SourceLocation) -> Result<&str, ScriptError> {
    args[index].as_str().ok_or_else(|| {
        ScriptError::type_error(
            format!("must be str, not {}", args[index].type_name()),
            location,
        )
    })
}

/// An optional `str` argument; absent and `None` are the same
fn optional_string_arg(
    args: &[Value],
    index: usize,
    location: SourceLocation,
) -> Result<Option<&str>, ScriptError> {
    match args.get(index) {
        None | Some(Value::None) => Ok(None),
        Some(_) => string_arg(args, index, location).map(Some),
    }
}

impl Interpreter {
    pub(crate) fn get_attribute(
        &self,
        object: Value,
        name: &str,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        let methods = match &object {
            Value::Exception(exception) if name == "args" => {
                return Ok(Value::tuple(exception.args.clone()));
            }
            Value::List(_) => LIST_METHODS,
            Value::Dict(_) => DICT_METHODS,
            Value::Str(_) => STR_METHODS,
            _ => &[],
        };

        if methods.contains(&name) {
            return Ok(Value::Method(Rc::new(BoundMethod {
                receiver: object,
                name: name.to_string(),
            })));
        }

        Err(ScriptError::new(
            ExceptionKind::AttributeError,
            format!("'{}' object has no attribute '{}'", object.type_name(), name),
            location,
        ))
    }

    pub(crate) fn call_method(
        &mut self,
        method: &BoundMethod,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        let name = method.name.as_str();
        match &method.receiver {
            Value::List(items) if name == "sort" => {
                check_arity("sort", args.len(), 0, 0, location)?;
                self.list_sort(items, kwargs, location)
            }
            Value::List(items) => {
                reject_keywords(name, &kwargs, location)?;
                self.call_list_method(items, name, args, location)
            }
            Value::Dict(dict) => {
                if name != "update" {
                    reject_keywords(name, &kwargs, location)?;
                }
                self.call_dict_method(dict, name, args, kwargs, location)
            }
            Value::Str(text) => {
                reject_keywords(name, &kwargs, location)?;
                self.call_str_method(text, name, args, location)
            }
            other => Err(ScriptError::new(
                ExceptionKind::AttributeError,
                format!("'{}' object has no attribute '{}'", other.type_name(), name),
                location,
            )),
        }
    }

    fn call_list_method(
        &mut self,
        items: &Rc<RefCell<Vec<Value>>>,
        name: &str,
        mut args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        let arity = match name {
            "append" | "extend" | "remove" | "count" => (1, 1),
            "pop" => (0, 1),
            "insert" => (2, 2),
            "index" => (1, 1),
            _ => (0, 0),
        };
        check_arity(name, args.len(), arity.0, arity.1, location)?;

        match name {
            "append" => {
                items.borrow_mut().push(args.remove(0));
            }
            "extend" => {
                // Collect first: `xs.extend(xs)` reads the list it grows
                let extra = self.collect_iterable(&args[0], location)?;
                items.borrow_mut().extend(extra);
            }
            "insert" => {
                let index = expect_int(&args[0], location)?;
                let mut items = items.borrow_mut();
                let len = items.len() as i64;
                let position = if index < 0 { (index + len).max(0) } else { index.min(len) };
                items.insert(position as usize, args.remove(1));
            }
            "pop" => {
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    return Err(ScriptError::index_error("pop from empty list", location));
                }
                let len = items.len() as i64;
                let index = match args.first() {
                    Some(index) => expect_int(index, location)?,
                    None => -1,
                };
                let resolved = if index < 0 { index + len } else { index };
                if !(0..len).contains(&resolved) {
                    return Err(ScriptError::index_error("pop index out of range", location));
                }
                return Ok(items.remove(resolved as usize));
            }
            "remove" => {
                let position = items.borrow().iter().position(|item| *item == args[0]);
                let Some(position) = position else {
                    return Err(ScriptError::value_error("list.remove(x): x not in list", location));
                };
                items.borrow_mut().remove(position);
            }
            "index" => {
                let position = items.borrow().iter().position(|item| *item == args[0]);
                return match position {
                    Some(position) => Ok(Value::Int(position as i64)),
                    None => Err(ScriptError::value_error(
                        format!(
                            "{} is not in list",
                            args[0].repr().map_err(|err| ScriptError::from_snapshot(err, location))?
                        ),
                        location,
                    )),
                };
            }
            "count" => {
                let count = items.borrow().iter().filter(|item| **item == args[0]).count();
                return Ok(Value::Int(count as i64));
            }
            "reverse" => items.borrow_mut().reverse(),
            "clear" => items.borrow_mut().clear(),
            "copy" => return Ok(Value::list(items.borrow().clone())),
            _ => {}
        }
        Ok(Value::None)
    }

    /// `list.sort(key=None, reverse=False)`: stable, in place
    fn list_sort(
        &mut self,
        items: &Rc<RefCell<Vec<Value>>>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        let mut key = Value::None;
        let mut reverse = false;
        for (keyword, value) in kwargs {
            match keyword.as_str() {
                "key" => key = value,
                "reverse" => reverse = value.is_truthy(),
                other => {
                    return Err(ScriptError::type_error(
                        format!("'{}' is an invalid keyword argument for sort()", other),
                        location,
                    ))
                }
            }
        }

        let values = items.borrow().clone();
        let mut keyed = Vec::with_capacity(values.len());
        for value in values {
            let rank = match &key {
                Value::None => value.clone(),
                func => self.call_value(func, vec![value.clone()], Vec::new(), location)?,
            };
            keyed.push((rank, value));
        }

        // sort_by cannot fail, so the first comparison error is held aside
        let mut failure = None;
        keyed.sort_by(|(a, _), (b, _)| {
            if failure.is_some() {
                return Ordering::Equal;
            }
            let (a, b) = if reverse { (b, a) } else { (a, b) };
            let ordering = self.less_than(a, b, location).and_then(|less| {
                if less {
                    Ok(Ordering::Less)
                } else if self.less_than(b, a, location)? {
                    Ok(Ordering::Greater)
                } else {
                    Ok(Ordering::Equal)
                }
            });
            ordering.unwrap_or_else(|err| {
                failure = Some(err);
                Ordering::Equal
            })
        });
        if let Some(err) = failure {
            return Err(err);
        }

        *items.borrow_mut() = keyed.into_iter().map(|(_, value)| value).collect();
        Ok(Value::None)
    }

    fn call_dict_method(
        &mut self,
        dict: &Rc<RefCell<Dict>>,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        let arity = match name {
            "get" | "setdefault" => (1, 2),
            "pop" => (1, 2),
            "update" => (0, 1),
            _ => (0, 0),
        };
        check_arity(name, args.len(), arity.0, arity.1, location)?;
        let unhashable = |type_name: &str| ScriptError::unhashable(type_name, location);

        match name {
            "get" => {
                let found = dict.borrow().get(&args[0]).map_err(unhashable)?.cloned();
                Ok(found.or_else(|| args.get(1).cloned()).unwrap_or_default())
            }
            "keys" => Ok(Value::list(dict.borrow().keys())),
            "values" => Ok(Value::list(dict.borrow().values())),
            "items" => Ok(Value::list(
                dict.borrow()
                    .iter()
                    .map(|(key, value)| Value::tuple(vec![key.clone(), value.clone()]))
                    .collect(),
            )),
            "pop" => {
                let removed = dict.borrow_mut().remove(&args[0]).map_err(unhashable)?;
                match (removed, args.get(1)) {
                    (Some(value), _) => Ok(value),
                    (None, Some(default)) => Ok(default.clone()),
                    (None, None) => Err(ScriptError::key_error(args[0].clone(), location)),
                }
            }
            "setdefault" => {
                let existing = dict.borrow().get(&args[0]).map_err(unhashable)?.cloned();
                if let Some(value) = existing {
                    return Ok(value);
                }
                let default = args.get(1).cloned().unwrap_or_default();
                dict.borrow_mut()
                    .insert(args[0].clone(), default.clone())
                    .map_err(unhashable)?;
                Ok(default)
            }
            "update" => {
                let mut updated = dict.borrow().clone();
                if let Some(source) = args.first() {
                    self.update_dict(&mut updated, source, location)?;
                }
                for (key, value) in kwargs {
                    updated.insert(Value::str(&key), value).map_err(unhashable)?;
                }
                *dict.borrow_mut() = updated;
                Ok(Value::None)
            }
            "clear" => {
                dict.borrow_mut().clear();
                Ok(Value::None)
            }
            "copy" => Ok(Value::dict(dict.borrow().clone())),
            _ => Ok(Value::None),
        }
    }

    fn call_str_method(
        &mut self,
        text: &Rc<str>,
        name: &str,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        let arity = match name {
            "strip" | "lstrip" | "rstrip" | "split" => (0, 1),
            "join" | "startswith" | "endswith" | "find" | "count" => (1, 1),
            "replace" => (2, 2),
            _ => (0, 0),
        };
        check_arity(name, args.len(), arity.0, arity.1, location)?;

        Ok(match name {
            "upper" => Value::str(&text.to_uppercase()),
            "lower" => Value::str(&text.to_lowercase()),
            "strip" => Value::str(strip(text, optional_string_arg(&args, 0, location)?, true, true)),
            "lstrip" => Value::str(strip(text, optional_string_arg(&args, 0, location)?, true, false)),
            "rstrip" => Value::str(strip(text, optional_string_arg(&args, 0, location)?, false, true)),
            "split" => {
                let parts: Vec<Value> = match optional_string_arg(&args, 0, location)? {
                    Some("") => return Err(ScriptError::value_error("empty separator", location)),
                    Some(sep) => text.split(sep).map(Value::str).collect(),
                    None => text.split_whitespace().map(Value::str).collect(),
                };
                Value::list(parts)
            }
            "join" => {
                let mut joined = String::new();
                for (i, item) in self.iterate(&args[0], location)?.enumerate() {
                    let Value::Str(part) = &item else {
                        return Err(ScriptError::type_error(
                            format!(
                                "sequence item {}: expected str instance, {} found",
                                i,
                                item.type_name()
                            ),
                            location,
                        ));
                    };
                    if i > 0 {
                        joined.push_str(text);
                    }
                    joined.push_str(part);
                }
                Value::str(&joined)
            }
            "replace" => Value::str(&text.replace(string_arg(&args, 0, location)?, string_arg(&args, 1, location)?)),
            "startswith" => Value::Bool(text.starts_with(string_arg(&args, 0, location)?)),
            "endswith" => Value::Bool(text.ends_with(string_arg(&args, 0, location)?)),
            "find" => Value::Int(match text.find(string_arg(&args, 0, location)?) {
                Some(byte_index) => text[..byte_index].chars().count() as i64,
                None => -1,
            }),
            "count" => {
                let needle = string_arg(&args, 0, location)?;
                let count = if needle.is_empty() {
                    text.chars().count() + 1
                } else {
                    text.matches(needle).count()
                };
                Value::Int(count as i64)
            }
            "isdigit" => Value::Bool(!text.is_empty() && text.chars().all(|c| c.is_ascii_digit())),
            "isalpha" => Value::Bool(!text.is_empty() && text.chars().all(char::is_alphabetic)),
            _ => Value::None,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::{ExceptionKind, ScriptError};
    use crate::parser::parse_program;
    use crate::terminal::Terminal;

    fn run(source: &str) -> Result<String, ScriptError> {
        let (terminal, buffer) = Terminal::capture();
        let program = parse_program(source).unwrap();
        Interpreter::new(terminal).run(&program, "test.py")?;
        Ok(buffer.contents())
    }

    #[test]
    fn test_list_methods() {
        let source = "xs = [3, 1]\nxs.append(2)\nxs.insert(0, 9)\nxs.extend(xs)\nprint(xs)\nprint(xs.pop(), xs.pop(0), xs.index(1), xs.count(3))\nxs.remove(3)\nxs.reverse()\nprint(xs, xs.copy() is xs)\n";
        assert_eq!(
            run(source).unwrap(),
            "[9, 3, 1, 2, 9, 3, 1, 2]\n2 9 1 2\n[1, 3, 9, 2, 1] False\n"
        );
    }

    #[test]
    fn test_sort_is_stable_with_key_and_reverse() {
        let source = "words = ['bb', 'a', 'cc', 'd']\nwords.sort(key=len)\nprint(words)\nwords.sort(key=len, reverse=True)\nprint(words)\nnums = [3, 1, 2]\nnums.sort()\nprint(nums)\n";
        assert_eq!(
            run(source).unwrap(),
            "['a', 'd', 'bb', 'cc']\n['bb', 'cc', 'a', 'd']\n[1, 2, 3]\n"
        );
    }

    #[test]
    fn test_sort_propagates_comparison_errors() {
        let err = run("xs = [1, 'a']\nxs.sort()\n").unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::TypeError);
        assert!(err.to_string().contains("not supported between instances of"));
    }

    #[test]
    fn test_dict_methods() {
        let source = "d = {'a': 1}\nprint(d.get('a'), d.get('z'), d.get('z', 0))\nprint(d.setdefault('b', 2), d.setdefault('a', 5))\nd.update({'c': 3}, d=4)\nprint(d.keys(), d.values(), d.items())\nprint(d.pop('a'), d.pop('zz', None), d)\n";
        assert_eq!(
            run(source).unwrap(),
            "1 None 0\n2 1\n['a', 'b', 'c', 'd'] [1, 2, 3, 4] [('a', 1), ('b', 2), ('c', 3), ('d', 4)]\n1 None {'b': 2, 'c': 3, 'd': 4}\n"
        );
    }

    #[test]
    fn test_str_methods() {
        let source = "s = '  Hello World  '\nprint(s.strip().lower(), s.split(), 'a,b,,c'.split(','))\nprint('-'.join(['x', 'y']), 'abc'.replace('b', 'B'), 'abc'.find('c'), 'abc'.find('z'))\nprint('42'.isdigit(), 'ab1'.isalpha(), 'xxy'.startswith('xx'), 'xxy'.endswith('x'))\nprint('--a--'.strip('-'), 'banana'.count('an'))\n";
        assert_eq!(
            run(source).unwrap(),
            "hello world ['Hello', 'World'] ['a', 'b', '', 'c']\nx-y aBc 2 -1\nTrue False True False\na 2\n"
        );
    }

    #[test]
    fn test_unknown_attribute() {
        let err = run("xs = []\nxs.push(1)\n").unwrap_err();
        assert_eq!(err.to_string(), "AttributeError: 'list' object has no attribute 'push'");
    }

    #[test]
    fn test_exception_args() {
        let out = run("try:\n    raise ValueError('bad', 2)\nexcept ValueError as e:\n    print(e.args)\n").unwrap();
        assert_eq!(out, "('bad', 2)\n");
    }

    #[test]
    fn test_method_repr() {
        let out = run("xs = []\nprint(repr(xs.append))\n").unwrap();
        assert_eq!(out, "<built-in method append of list object>\n");
    }
}
