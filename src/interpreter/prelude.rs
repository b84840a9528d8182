//! Library functions written in the scripting language itself
//!
//! The prelude is executed once, before the main module, directly into the
//! built-in namespace. Its frames carry [`PRELUDE_FILENAME`] so a trace hook can
//! tell library code apart from the traced script; a script function passed to
//! one of these (for example to `map`) still runs in its own frame and is
//! reported normally.
//!
//! Everything that would be lazy elsewhere (`map`, `zip`, `enumerate`, ...)
//! returns a list.

/// File name of prelude frames
pub const PRELUDE_FILENAME: &str = "<prelude>";

pub const PRELUDE_SOURCE: &str = r#"
def sum(iterable, start=0):
    total = start
    for item in iterable:
        total = total + item
    return total

def sorted(iterable, key=None, reverse=False):
    result = list(iterable)
    result.sort(key=key, reverse=reverse)
    return result

def reversed(sequence):
    result = list(sequence)
    result.reverse()
    return result

def enumerate(iterable, start=0):
    result = []
    index = start
    for item in iterable:
        result.append((index, item))
        index += 1
    return result

def zip(first, second, third=None):
    a = list(first)
    b = list(second)
    count = min(len(a), len(b))
    if third is not None:
        c = list(third)
        count = min(count, len(c))
    result = []
    i = 0
    while i < count:
        if third is None:
            result.append((a[i], b[i]))
        else:
            result.append((a[i], b[i], c[i]))
        i += 1
    return result

def map(function, iterable):
    result = []
    for item in iterable:
        result.append(function(item))
    return result

def filter(function, iterable):
    result = []
    for item in iterable:
        if function is None:
            keep = item
        else:
            keep = function(item)
        if keep:
            result.append(item)
    return result

def any(iterable):
    for item in iterable:
        if item:
            return True
    return False

def all(iterable):
    for item in iterable:
        if not item:
            return False
    return True
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::engine::Interpreter;
    use crate::parser::parse_program;
    use crate::terminal::Terminal;

    fn output(source: &str) -> String {
        let (terminal, buffer) = Terminal::capture();
        let program = parse_program(source).unwrap();
        Interpreter::new(terminal).run(&program, "test.py").unwrap();
        buffer.contents()
    }

    #[test]
    fn test_prelude_parses() {
        let program = parse_program(PRELUDE_SOURCE).unwrap();
        assert_eq!(program.body.len(), 9);
    }

    #[test]
    fn test_sequence_helpers() {
        let source = "print(sum([1, 2], 10), sorted([3, 1, 2], reverse=True), reversed('ab'))\nprint(enumerate(['x', 'y'], 1), zip([1, 2, 3], 'ab'), zip([1], [2], [3]))\n";
        assert_eq!(
            output(source),
            "13 [3, 2, 1] ['b', 'a']\n[(1, 'x'), (2, 'y')] [(1, 'a'), (2, 'b')] [(1, 2, 3)]\n"
        );
    }

    #[test]
    fn test_functional_helpers() {
        let source = "def double(x):\n    return x * 2\nprint(map(double, [1, 2]), filter(None, [0, 1, '', 'a']), any([0, 1]), all([]))\n";
        assert_eq!(output(source), "[2, 4] [1, 'a'] True True\n");
    }

    #[test]
    fn test_script_can_shadow_prelude_names() {
        let source = "def sum(xs):\n    return 'mine'\nprint(sum([1]))\n";
        assert_eq!(output(source), "mine\n");
    }
}
