//! Line-oriented extraction of server blocks and directives from NGINX config text
//!
//! This is not a grammar. A brace-depth counter over raw lines is enough to
//! recover `listen`, `server_name` and `ssl_certificate`; nested blocks such
//! as `location` stay inside the server block that contains them. `#` and
//! braces inside quoted strings are plain text.

/// Scanner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Outside,
    Inside(usize),
}

/// Split configuration text into the text of each top-level `server { ... }` block
pub fn parse_server_blocks(config: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    let mut state = Scan::Outside;

    for line in config.lines() {
        let code = strip_comment(line);

        let depth = match state {
            Scan::Outside if opens_server_block(code) => {
                current.clear();
                0
            }
            Scan::Outside => continue,
            Scan::Inside(depth) => depth,
        };

        current.push_str(line);
        current.push('\n');

        let (opened, closed) = count_braces(code);
        let depth = (depth + opened).saturating_sub(closed);

        if depth == 0 {
            blocks.push(std::mem::take(&mut current));
            state = Scan::Outside;
        } else {
            state = Scan::Inside(depth);
        }
    }

    blocks
}

/// Value of the first line in `block` that starts with `directive`, with the
/// name, trailing `;` and surrounding whitespace removed. Empty if absent.
pub fn extract_directive(block: &str, directive: &str) -> String {
    directive_values(block, directive)
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Values of every line in `block` that starts with `directive`, in order
pub fn directive_values<'a>(block: &'a str, directive: &'a str) -> impl Iterator<Item = &'a str> {
    block.lines().filter_map(move |line| {
        let trimmed = strip_comment(line).trim();
        let rest = trimmed.strip_prefix(directive)?;

        // `listen` must not match `listen_backlog`
        if !(rest.is_empty() || rest.starts_with(char::is_whitespace) || rest.starts_with(';')) {
            return None;
        }

        Some(rest.trim().trim_end_matches(';').trim())
    })
}

/// Port and TLS flag decoded from a `listen` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listen {
    pub port: String,
    pub ssl: bool,
}

impl Listen {
    /// Decode `"[::]:8443 ssl http2"`, `"0.0.0.0:80"` or `"443 ssl"`
    pub fn parse(value: &str) -> Option<Self> {
        let mut tokens = value.trim().trim_end_matches(';').split_whitespace();
        let address = tokens.next()?;

        let port = match address.rfind(':') {
            Some(idx) => &address[idx + 1..],
            None => address,
        };

        Some(Self {
            port: port.to_string(),
            ssl: tokens.any(|t| t == "ssl"),
        })
    }
}

fn opens_server_block(code: &str) -> bool {
    code.trim()
        .strip_prefix("server")
        .map(|rest| rest.trim_start().starts_with('{'))
        .unwrap_or(false)
}

/// Characters of `line` outside single or double quotes, with their byte offsets.
/// A backslash hides the character after it.
fn unquoted_chars(line: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    line.char_indices().filter(move |&(_, c)| {
        if escaped {
            escaped = false;
            return false;
        }
        if c == '\\' {
            escaped = true;
            return false;
        }
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                false
            }
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                false
            }
            None => true,
        }
    })
}

fn count_braces(code: &str) -> (usize, usize) {
    unquoted_chars(code).fold((0, 0), |(open, close), (_, c)| match c {
        '{' => (open + 1, close),
        '}' => (open, close + 1),
        _ => (open, close),
    })
}

/// `line` up to its first `#` outside quotes
fn strip_comment(line: &str) -> &str {
    match unquoted_chars(line).find(|&(_, c)| c == '#') {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
