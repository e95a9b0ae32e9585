// The input stage: flatten the file to a single line, find entry starts, and
// pull raw (type, key, fields) tuples out of each entry's span. Nothing here
// errors out on malformed input; broken entries are reported and dropped.

// One scanned entry, before any normalization.
#[derive(Debug)]
pub struct RawEntry {
    pub entry_type: String,
    pub cite_key: String,
    pub fields: Vec<(String, String)>,
}

struct EntryHead {
    entry_type: String,
    cite_key: String,
    // length of the matched head, up to and including the comma
    len: usize,
}

// Replaces newlines and tabs with spaces and collapses runs of spaces, so the
// scanner only ever has to deal with single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = false;
    for c in text.trim().chars() {
        let c = if matches!(c, '\r' | '\n' | '\t') { ' ' } else { c };
        if c == ' ' {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }
    out
}

// Matches "@type{key," at the start of chars, each token optionally preceded
// or followed by a single space. The type token runs up to a space or '{',
// the key token up to a space or ','.
fn match_entry_head(chars: &[char]) -> Option<EntryHead> {
    if chars.first() != Some(&'@') {
        return None;
    }
    let mut i = 1;
    if chars.get(i) == Some(&' ') {
        i += 1;
    }
    let start = i;
    while i < chars.len() && chars[i] != ' ' && chars[i] != '{' {
        i += 1;
    }
    if i == start {
        return None;
    }
    let entry_type: String = chars[start..i].iter().collect();
    if chars.get(i) == Some(&' ') {
        i += 1;
    }
    if chars.get(i) != Some(&'{') {
        return None;
    }
    i += 1;
    if chars.get(i) == Some(&' ') {
        i += 1;
    }
    let start = i;
    while i < chars.len() && chars[i] != ' ' && chars[i] != ',' {
        i += 1;
    }
    if i == start {
        return None;
    }
    let cite_key: String = chars[start..i].iter().collect();
    if chars.get(i) == Some(&' ') {
        i += 1;
    }
    if chars.get(i) != Some(&',') {
        return None;
    }
    Some(EntryHead {
        entry_type,
        cite_key,
        len: i + 1,
    })
}

fn find_at(chars: &[char], from: usize) -> Option<usize> {
    chars[from..].iter().position(|c| *c == '@').map(|p| p + from)
}

// Pulls "name = value" pairs out of one entry's span, starting right after
// the head's comma. Values come brace-delimited (nesting tracked), quoted, or
// bare. Returns None when the scan hits the span boundary before the entry
// terminates.
fn extract_fields(chars: &[char], mut i: usize, next_start: usize) -> Option<Vec<(String, String)>> {
    let mut fields = Vec::new();
    if i < chars.len() && chars[i] == ' ' {
        i += 1;
    }
    while i < next_start && chars[i] != '}' && chars[i] != '@' {
        let mut name = String::new();
        while i < next_start && chars[i] != ' ' && chars[i] != '=' {
            name.push(chars[i]);
            i += 1;
        }
        while i < next_start && (chars[i] == ' ' || chars[i] == '=') {
            i += 1;
        }
        let mut value = String::new();
        if i < next_start {
            // A braced or quoted value owns its closing delimiter; a bare
            // value stops before its terminator so a '}' there still closes
            // the entry.
            let (stop, consume_stop): (&[char], bool) = if chars[i] == '{' {
                i += 1;
                (&['}'], true)
            } else if chars[i] == '"' {
                i += 1;
                (&['"'], true)
            } else {
                (&[',', ' ', '}'], false)
            };
            let mut level = 0;
            while i < next_start && (level > 0 || !stop.contains(&chars[i])) {
                value.push(chars[i]);
                if chars[i] == '{' {
                    level += 1;
                } else if chars[i] == '}' {
                    level -= 1;
                }
                i += 1;
            }
            if consume_stop && i < next_start {
                i += 1;
            }
            while i < next_start && (chars[i] == ' ' || chars[i] == ',') {
                i += 1;
            }
        }
        fields.push((name, value));
    }
    if i == next_start {
        return None;
    }
    Some(fields)
}

// Walks every '@' in the text. Positions where the head pattern matches start
// an entry; for anything else the decision function is asked whether the
// near-match really is an invalid entry. A confirmed-invalid position still
// bounds the span of the entry before it, but produces no entry itself.
pub fn scan_entries(text: &str, mut confirm_invalid: impl FnMut(&str) -> bool) -> Vec<RawEntry> {
    let chars: Vec<char> = text.chars().collect();

    let mut starts = Vec::new();
    let mut count = 0;
    let mut next = find_at(&chars, 0);
    while let Some(at) = next {
        if match_entry_head(&chars[at..]).is_some() {
            starts.push(at);
            count += 1;
        } else {
            let context: String = chars[at..(at + 50).min(chars.len())].iter().collect();
            if confirm_invalid(&context) {
                println!("Ignoring invalid entry {}", context);
                starts.push(at);
            }
        }
        next = find_at(&chars, at + 1);
    }
    println!("Found {} possible entries", count);

    let mut entries = Vec::new();
    for (idx, &start) in starts.iter().enumerate() {
        let head = match match_entry_head(&chars[start..]) {
            Some(head) => head,
            // a confirmed-invalid boundary, nothing to read
            None => continue,
        };
        let next_start = match starts.get(idx + 1) {
            Some(&next_start) => next_start,
            None => chars.len(),
        };
        match extract_fields(&chars, start + head.len, next_start) {
            Some(fields) => entries.push(RawEntry {
                entry_type: head.entry_type,
                cite_key: head.cite_key,
                fields,
            }),
            None => println!(
                "@{}{{{}}} is incomplete, skipping it",
                head.entry_type, head.cite_key
            ),
        }
    }
    entries
}
