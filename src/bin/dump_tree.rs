//! Tree dumping tool for debugging the Java host lowering.
//!
//! `dump_tree <file.java>` prints the lowered bugscan tree; `--raw` prints the
//! tree-sitter parse tree instead.

use std::env;
use std::fs;

fn print_raw(root: tree_sitter::Node, source: &str) {
    let mut stack = vec![(root, 0usize)];
    while let Some((node, indent)) = stack.pop() {
        let indent_str = "  ".repeat(indent);
        let kind = node.kind();

        let text = source.get(node.byte_range()).unwrap_or("");
        let text_display = match text.char_indices().nth(50) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        };
        let text_display = text_display.replace('\n', "\\n");

        match field_name(node) {
            Some(field) => println!("{indent_str}{field}: {kind}  \"{text_display}\""),
            None => println!("{indent_str}{kind}  \"{text_display}\""),
        }

        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev().map(|child| (child, indent + 1)));
    }
}

fn field_name(node: tree_sitter::Node) -> Option<&'static str> {
    let parent = node.parent()?;
    let mut cursor = parent.walk();
    if !cursor.goto_first_child() {
        return None;
    }
    loop {
        if cursor.node() == node {
            return cursor.field_name();
        }
        if !cursor.goto_next_sibling() {
            return None;
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let (raw, file_path) = match args.as_slice() {
        [flag, path] if flag == "--raw" => (true, path),
        [path] => (false, path),
        _ => {
            eprintln!("Usage: dump_tree [--raw] <file.java>");
            std::process::exit(1);
        }
    };

    let source = fs::read_to_string(file_path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", file_path, e);
        std::process::exit(1);
    });

    if raw {
        let mut parser = tree_sitter::Parser::new();
        if let Err(e) = parser.set_language(tree_sitter_java::language()) {
            eprintln!("Failed to set language: {e:?}");
            std::process::exit(1);
        }
        let Some(tree) = parser.parse(&source, None) else {
            eprintln!("Failed to parse {file_path}");
            std::process::exit(1);
        };
        println!("tree-sitter tree for {}:", file_path);
        println!("================");
        print_raw(tree.root_node(), &source);
        return;
    }

    let unit = bugscan::host::parse_java(&source).unwrap_or_else(|e| {
        eprintln!("Failed to parse {}: {}", file_path, e);
        std::process::exit(1);
    });

    println!("Tree for {}:", file_path);
    println!("================");
    print!("{}", unit.tree.dump(unit.text()));
}
