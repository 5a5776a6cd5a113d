//! A minimal declarative graph format: just enough to give the `anvil`
//! binary something to build against. This is deliberately far short of
//! a rule language -- no variables, no wildcards, no includes. Graphs are
//! built directly from this file, not expanded from a template language.
//!
//! Grammar, one statement per line, `#` starts a line comment:
//!
//! ```text
//! node NAME [cmd="..."] [label="..."] [dep=a,b,c] ...
//! shared NAME = TAG
//! exclusive NAME = TAG
//! default NAME
//! ```
//!
//! `dep=` may repeat on the same `node` line or list several names
//! comma-separated; both add edges. `shared`/`exclusive` lines naming the
//! same TAG join the same mutex group.
//!
//! Tokenized with `Scanner` (`scanner.rs`).

use crate::canon::canon_path;
use crate::constraints;
use crate::graph::{Graph, NodeId};
use crate::scanner::{ParseResult, Scanner};
use rustc_hash::FxHashMap;

pub struct GraphFile {
    pub default_target: Option<NodeId>,
}

pub fn load(graph: &mut Graph, filename: &str, source: &str) -> Result<GraphFile, String> {
    let mut buf = source.as_bytes().to_vec();
    let mut s = Scanner::new(&mut buf);
    let mut shared_groups: FxHashMap<String, Vec<NodeId>> = FxHashMap::default();
    let mut exclusive_groups: FxHashMap<String, Vec<NodeId>> = FxHashMap::default();
    let mut default_target = None;

    loop {
        skip_blank(&mut s);
        if s.peek() == '\0' {
            break;
        }

        let keyword = read_word(&mut s);
        let result = match keyword.as_str() {
            "node" => parse_node(graph, &mut s),
            "shared" => parse_constraint_line(graph, &mut s, &mut shared_groups),
            "exclusive" => parse_constraint_line(graph, &mut s, &mut exclusive_groups),
            "default" => {
                skip_inline_spaces(&mut s);
                let name = read_word(&mut s);
                default_target = Some(graph.node_id(&canon_path(&name)));
                Ok(())
            }
            other => s.parse_error(format!("unknown directive {:?}", other)),
        };
        if let Err(err) = result {
            return Err(s.format_parse_error(filename, err));
        }
        skip_to_eol(&mut s);
    }

    for members in shared_groups.values() {
        constraints::declare_shared_group(graph, members);
    }
    for members in exclusive_groups.values() {
        constraints::declare_exclusive_group(graph, members);
    }

    Ok(GraphFile { default_target })
}

fn skip_blank(s: &mut Scanner) {
    loop {
        match s.peek() {
            ' ' | '\t' | '\n' | '\r' => s.next(),
            '#' => skip_to_eol_keep_newline(s),
            _ => break,
        }
    }
}

fn skip_inline_spaces(s: &mut Scanner) {
    while s.peek() == ' ' || s.peek() == '\t' {
        s.next();
    }
}

fn skip_to_eol_keep_newline(s: &mut Scanner) {
    while s.peek() != '\n' && s.peek() != '\0' {
        s.next();
    }
}

fn skip_to_eol(s: &mut Scanner) {
    skip_to_eol_keep_newline(s);
    if s.peek() == '\n' {
        s.next();
    }
}

/// Reads until whitespace, `=`, or end of input. Used for keywords,
/// names, and attribute keys alike -- none of them may contain `=` or
/// spaces in this format.
fn read_word(s: &mut Scanner) -> String {
    let start = s.ofs;
    loop {
        let c = s.peek();
        if c == '\0' || c == '=' || c.is_whitespace() {
            break;
        }
        s.next();
    }
    s.slice(start, s.ofs).to_string()
}

/// Reads an attribute value: a `"..."` quoted string (no escapes), or a
/// bare word if unquoted.
fn read_value(s: &mut Scanner) -> ParseResult<String> {
    if s.peek() == '"' {
        s.next();
        let start = s.ofs;
        loop {
            match s.peek() {
                '"' => break,
                '\0' | '\n' => return s.parse_error("unterminated quoted string"),
                _ => s.next(),
            }
        }
        let value = s.slice(start, s.ofs).to_string();
        s.next(); // closing quote
        Ok(value)
    } else {
        Ok(read_word(s))
    }
}

fn parse_node(graph: &mut Graph, s: &mut Scanner) -> ParseResult<()> {
    skip_inline_spaces(s);
    let name = read_word(s);
    let id = graph.node_id(&canon_path(&name));

    let mut cmdline: Option<String> = None;
    let mut label: Option<String> = None;
    let mut deps: Vec<String> = Vec::new();

    loop {
        skip_inline_spaces(s);
        if matches!(s.peek(), '\n' | '\0' | '#') {
            break;
        }
        let key = read_word(s);
        s.expect('=')?;
        match key.as_str() {
            "cmd" => cmdline = Some(read_value(s)?),
            "label" => label = Some(read_value(s)?),
            "dep" => {
                let value = read_value(s)?;
                for part in value.split(',') {
                    let part = part.trim();
                    if !part.is_empty() {
                        deps.push(part.to_string());
                    }
                }
            }
            other => return s.parse_error(format!("unknown node attribute {:?}", other)),
        }
    }

    if let Some(cmdline) = cmdline {
        graph.make_real(id, cmdline, label);
    }
    for dep in deps {
        let dep_id = graph.node_id(&canon_path(&dep));
        graph.add_dep(id, dep_id);
    }
    Ok(())
}

fn parse_constraint_line(graph: &mut Graph, s: &mut Scanner, groups: &mut FxHashMap<String, Vec<NodeId>>) -> ParseResult<()> {
    skip_inline_spaces(s);
    let name = read_word(s);
    let id = graph.node_id(&canon_path(&name));
    skip_inline_spaces(s);
    s.expect('=')?;
    skip_inline_spaces(s);
    let tag = read_word(s);
    groups.entry(tag).or_default().push(id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nodes_commands_and_deps() {
        let mut g = Graph::new();
        let src = "node src.c\nnode obj.o cmd=\"cc src.c\" dep=src.c\nnode app cmd=\"ld obj.o\" dep=obj.o\ndefault app\n";
        let parsed = load(&mut g, "build.graph", src).unwrap();

        let obj = g.lookup("obj.o").unwrap();
        let app = g.lookup("app").unwrap();
        let srcn = g.lookup("src.c").unwrap();

        assert!(g.node(obj).job.real);
        assert_eq!(g.node(obj).job.cmdline, "cc src.c");
        assert_eq!(g.node(obj).first_dep, vec![srcn]);
        assert_eq!(g.node(app).first_dep, vec![obj]);
        assert_eq!(parsed.default_target, Some(app));
    }

    #[test]
    fn comma_separated_deps_all_become_edges() {
        let mut g = Graph::new();
        let src = "node a.o\nnode b.o\nnode out cmd=\"ld\" dep=a.o,b.o\n";
        load(&mut g, "build.graph", src).unwrap();

        let out = g.lookup("out").unwrap();
        let a = g.lookup("a.o").unwrap();
        let b = g.lookup("b.o").unwrap();
        assert_eq!(g.node(out).first_dep, vec![a, b]);
    }

    #[test]
    fn shared_and_exclusive_tags_group_jobs() {
        let mut g = Graph::new();
        let src = "node a cmd=\"cmd-a\"\nnode b cmd=\"cmd-b\"\nshared a = lockfile\nshared b = lockfile\n";
        load(&mut g, "build.graph", src).unwrap();

        let a = g.lookup("a").unwrap();
        let b = g.lookup("b").unwrap();
        assert!(g.node(a).job.constraint_shared.contains(&b));
        assert!(g.node(b).job.constraint_shared.contains(&a));
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let mut g = Graph::new();
        let src = "# a build graph\n\nnode src.c\n\n# done\n";
        let parsed = load(&mut g, "build.graph", src).unwrap();
        assert!(g.lookup("src.c").is_some());
        assert!(parsed.default_target.is_none());
    }

    #[test]
    fn unknown_directive_is_a_parse_error() {
        let mut g = Graph::new();
        let err = load(&mut g, "build.graph", "bogus\n").unwrap_err();
        assert!(err.contains("unknown directive"));
    }
}
