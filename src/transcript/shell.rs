//! Static detection of file deletions in shell commands.
//!
//! This never runs, expands or globs anything: it splits the command line
//! into sub-commands, picks out the `rm` invocations and reads their path
//! operands as written.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Separators between independent sub-commands.
static COMMAND_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&&|\|\||;|\r?\n").expect("valid separator regex"));

/// `rm`, any number of single-dash flag groups, then the operands.
static RM_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^rm(?:\s+-[A-Za-z]+)*\s+(.+)$").expect("valid rm regex"));

/// Paths named by `rm` sub-commands of `command`.
pub fn deleted_paths(command: &str) -> BTreeSet<String> {
    COMMAND_SEPARATOR
        .split(command)
        .filter_map(|sub| RM_COMMAND.captures(sub.trim()))
        .filter_map(|caps| caps.get(1))
        .flat_map(|operands| rm_operands(split_operands(operands.as_str())))
        .collect()
}

/// Split operands into words, keeping quoted segments together. Falls back
/// to plain whitespace splitting when the quotes do not balance.
fn split_operands(operands: &str) -> Vec<String> {
    shlex::split(operands)
        .unwrap_or_else(|| operands.split_whitespace().map(String::from).collect())
}

/// The path words of one `rm` invocation. Flags and redirects are skipped;
/// a pipe or a trailing `&` ends the invocation.
fn rm_operands(words: Vec<String>) -> Vec<String> {
    let mut paths = Vec::new();
    let mut words = words.into_iter();
    while let Some(word) = words.next() {
        if ends_invocation(&word) {
            break;
        }
        match redirect(&word) {
            Some(Redirect::Bare) => {
                words.next();
            }
            Some(Redirect::WithTarget) => {}
            None if word.is_empty() || word.starts_with('-') => {}
            None => paths.push(word),
        }
    }
    paths
}

/// `|`, `|&` or a lone `&`: the rest belongs to another command.
fn ends_invocation(word: &str) -> bool {
    word.starts_with('|') || word == "&"
}

enum Redirect {
    /// `>`, `2>>`, `<`: the target is the next word.
    Bare,
    /// `>log`, `2>/dev/null`, `2>&1`.
    WithTarget,
}

fn redirect(word: &str) -> Option<Redirect> {
    let rest = word.trim_start_matches(|c: char| c.is_ascii_digit() || c == '&');
    if !(rest.starts_with('>') || rest.starts_with('<')) {
        return None;
    }
    let target = rest.trim_start_matches(['>', '<']);
    Some(if target.is_empty() {
        Redirect::Bare
    } else {
        Redirect::WithTarget
    })
}
