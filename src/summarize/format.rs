//! Reformats the model's loosely marked-up text into HTML.
//!
//! Grammar, line by line:
//! - `H1 `..`H4 ` prefix: heading, rendered `<hN>rest</hN>`.
//! - `- ` or `* ` prefix: bullet. A run of bullets renders as
//!   `<ul><br>- a<br>- b</ul>`, attached to the preceding line without a newline.
//! - anything else passes through unchanged.

enum Block<'a> {
    Line(String),
    Bullets(Vec<&'a str>),
}

fn heading(line: &str) -> Option<String> {
    let level = match line.get(..3)? {
        "H1 " => 1,
        "H2 " => 2,
        "H3 " => 3,
        "H4 " => 4,
        _ => return None,
    };
    Some(format!("<h{level}>{}</h{level}>", line[3..].trim_end()))
}

fn bullet(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .map(str::trim_end)
}

pub fn format_ai_response(text: &str) -> String {
    let mut blocks: Vec<Block> = Vec::new();
    for line in text.lines() {
        if let Some(item) = bullet(line) {
            match blocks.last_mut() {
                Some(Block::Bullets(items)) => items.push(item),
                _ => blocks.push(Block::Bullets(vec![item])),
            }
        } else {
            let rendered = heading(line).unwrap_or_else(|| line.to_string());
            blocks.push(Block::Line(rendered));
        }
    }

    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        match block {
            Block::Line(line) => {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(line);
            }
            Block::Bullets(items) => {
                out.push_str("<ul>");
                for item in items {
                    out.push_str("<br>- ");
                    out.push_str(item);
                }
                out.push_str("</ul>");
            }
        }
    }
    out
}
