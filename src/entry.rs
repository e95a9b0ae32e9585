use std::collections::HashMap;
use std::fmt;

// The entry kinds bibtex knows about. Anything else becomes Misc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Article,
    Book,
    Booklet,
    Conference,
    InBook,
    InCollection,
    InProceedings,
    Manual,
    MasterThesis,
    Misc,
    PhdThesis,
    Proceedings,
    TechReport,
    Unpublished,
}

impl EntryType {
    pub fn parse(name: &str) -> EntryType {
        match name.to_lowercase().as_str() {
            "article" => EntryType::Article,
            "book" => EntryType::Book,
            "booklet" => EntryType::Booklet,
            "conference" => EntryType::Conference,
            "inbook" => EntryType::InBook,
            "incollection" => EntryType::InCollection,
            "inproceedings" => EntryType::InProceedings,
            "manual" => EntryType::Manual,
            "masterthesis" => EntryType::MasterThesis,
            "phdthesis" => EntryType::PhdThesis,
            "proceedings" => EntryType::Proceedings,
            "techreport" => EntryType::TechReport,
            "unpublished" => EntryType::Unpublished,
            _ => EntryType::Misc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Article => "article",
            EntryType::Book => "book",
            EntryType::Booklet => "booklet",
            EntryType::Conference => "conference",
            EntryType::InBook => "inbook",
            EntryType::InCollection => "incollection",
            EntryType::InProceedings => "inproceedings",
            EntryType::Manual => "manual",
            EntryType::MasterThesis => "masterthesis",
            EntryType::Misc => "misc",
            EntryType::PhdThesis => "phdthesis",
            EntryType::Proceedings => "proceedings",
            EntryType::TechReport => "techreport",
            EntryType::Unpublished => "unpublished",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// The field names a record may carry, in the order they are written out.
pub const FIELD_TYPES: [&str; 26] = [
    "title",
    "author",
    "month",
    "year",
    "doi",
    "url",
    "issn",
    "isbn",
    "address",
    "annote",
    "booktitle",
    "chapter",
    "edition",
    "editor",
    "howpublished",
    "institution",
    "journal",
    "note",
    "number",
    "organization",
    "pages",
    "publisher",
    "school",
    "series",
    "type",
    "volume",
];

fn recognized_field(name: &str) -> Option<&'static str> {
    FIELD_TYPES.iter().find(|field| **field == name).copied()
}

// Cleans up a raw field value: "{ " and " }" lose their inner space, the
// surroundings are trimmed, and matching outer brace pairs are peeled off
// until none remain.
pub fn normalize_value(value: &str) -> String {
    let replaced = value.replace("{ ", "{").replace(" }", "}");
    let mut value = replaced.trim();
    while value.starts_with('{') && value.ends_with('}') {
        value = &value[1..value.len() - 1];
    }
    value.to_string()
}

// Field values compare with braces dropped and case folded.
fn comparable(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .collect()
}

#[derive(Debug, Clone)]
pub struct Entry {
    entry_type: EntryType,
    cite_key: String,
    fields: HashMap<&'static str, String>,
    notes: Vec<String>,
}

impl Entry {
    pub fn new(entry_type: &str, cite_key: &str) -> Entry {
        Entry {
            entry_type: EntryType::parse(entry_type),
            cite_key: cite_key.to_string(),
            fields: HashMap::new(),
            notes: Vec::new(),
        }
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn cite_key(&self) -> &str {
        &self.cite_key
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    // Normalizes and stores one field. Unknown names and conflicting repeats
    // turn into notes instead of fields; on a repeat the first value wins.
    pub fn add_field(&mut self, name: &str, value: &str) {
        let value = normalize_value(value);
        if value.is_empty() {
            return;
        }
        let name = name.to_lowercase();
        let name = name.trim_start_matches(|c| c == '%' || c == '/' || c == ' ');
        let canonical = match recognized_field(name) {
            Some(canonical) => canonical,
            None => {
                self.notes.push(format!("{}={{{}}},", name, value));
                return;
            }
        };
        if let Some(existing) = self.fields.get(canonical) {
            if existing.to_lowercase() != value.to_lowercase() {
                self.notes
                    .push(format!("duplicate field: {}={}", canonical, value));
            }
            return;
        }
        self.fields.insert(canonical, value);
    }

    // Two entries are the same record when their citation keys match up to
    // case and one field set contains the other with equal values. When the
    // other entry is the richer one, its fields are pulled into self, so the
    // surviving copy keeps everything both variants knew.
    pub fn absorbs(&mut self, other: &Entry) -> bool {
        if self.cite_key.to_lowercase() != other.cite_key.to_lowercase() {
            return false;
        }
        if other.fields.keys().all(|name| self.fields.contains_key(name)) {
            if other
                .fields
                .iter()
                .all(|(name, value)| comparable(&self.fields[*name]) == comparable(value))
            {
                return true;
            }
        } else if self.fields.keys().all(|name| other.fields.contains_key(name)) {
            if self
                .fields
                .iter()
                .all(|(name, value)| comparable(value) == comparable(&other.fields[*name]))
            {
                for (name, value) in &other.fields {
                    self.fields.insert(*name, value.clone());
                }
                return true;
            }
        }
        false
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.notes.is_empty() {
            writeln!(f, "% {}{{{}}}", self.entry_type, self.cite_key)?;
            for note in &self.notes {
                writeln!(f, "% {}", note)?;
            }
        }
        writeln!(f, "@{}{{{},", self.entry_type, self.cite_key)?;
        for name in FIELD_TYPES {
            if let Some(value) = self.fields.get(name) {
                writeln!(f, "  {}={{{}}},", name, value)?;
            }
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_fallback() {
        assert_eq!(EntryType::parse("Article"), EntryType::Article);
        assert_eq!(EntryType::parse("PHDTHESIS"), EntryType::PhdThesis);
        assert_eq!(EntryType::parse("weblink"), EntryType::Misc);
        assert_eq!(EntryType::parse(""), EntryType::Misc);
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value("{ Bar }"), "Bar");
        assert_eq!(normalize_value("{{Nested}}"), "Nested");
        assert_eq!(normalize_value("  2020 "), "2020");
        assert_eq!(normalize_value("{}"), "");
        assert_eq!(normalize_value("A {Deep} B"), "A {Deep} B");
    }

    #[test]
    fn test_normalize_value_is_idempotent() {
        for raw in ["{ Bar }", "{{Nested}}", "  2020 ", "A {Deep} B", "{}"] {
            let once = normalize_value(raw);
            assert_eq!(normalize_value(&once), once);
        }
    }

    #[test]
    fn test_add_field_stores_recognized_names() {
        let mut entry = Entry::new("article", "foo");
        entry.add_field("Title", "{Bar}");
        entry.add_field("year", "2020");
        assert_eq!(entry.field("title"), Some("Bar"));
        assert_eq!(entry.field("year"), Some("2020"));
        assert_eq!(entry.field_count(), 2);
        assert!(entry.notes().is_empty());
    }

    #[test]
    fn test_add_field_strips_comment_markers() {
        let mut entry = Entry::new("article", "foo");
        entry.add_field("%title", "{Bar}");
        entry.add_field("/ author", "{Smith, J.}");
        assert_eq!(entry.field("title"), Some("Bar"));
        assert_eq!(entry.field("author"), Some("Smith, J."));
    }

    #[test]
    fn test_add_field_demotes_unrecognized_names() {
        let mut entry = Entry::new("article", "foo");
        entry.add_field("keywords", "{x}");
        assert_eq!(entry.field("keywords"), None);
        assert_eq!(entry.notes(), ["keywords={x},"]);
    }

    #[test]
    fn test_add_field_drops_empty_values() {
        let mut entry = Entry::new("article", "foo");
        entry.add_field("title", "{}");
        entry.add_field("year", "   ");
        assert!(!entry.has_fields());
        assert!(entry.notes().is_empty());
    }

    #[test]
    fn test_add_field_keeps_first_value_on_conflict() {
        let mut entry = Entry::new("article", "foo");
        entry.add_field("year", "2020");
        entry.add_field("year", "2021");
        assert_eq!(entry.field("year"), Some("2020"));
        assert_eq!(entry.notes(), ["duplicate field: year=2021"]);
    }

    #[test]
    fn test_add_field_ignores_equal_repeats() {
        let mut entry = Entry::new("article", "foo");
        entry.add_field("title", "Bar");
        entry.add_field("title", "{bar}");
        assert_eq!(entry.field("title"), Some("Bar"));
        assert!(entry.notes().is_empty());
    }

    #[test]
    fn test_absorbs_requires_matching_key() {
        let mut a = Entry::new("article", "Smith2020");
        a.add_field("title", "Foo");
        let mut b = Entry::new("article", "Jones2020");
        b.add_field("title", "Foo");
        assert!(!a.absorbs(&b));
    }

    #[test]
    fn test_absorbs_is_reflexive_up_to_key_case() {
        let mut a = Entry::new("article", "Smith2020");
        a.add_field("title", "{Foo}");
        a.add_field("year", "2020");
        let mut b = Entry::new("article", "smith2020");
        b.add_field("title", "foo");
        b.add_field("year", "2020");
        assert!(a.absorbs(&b));
    }

    #[test]
    fn test_absorbs_narrower_entry() {
        let mut a = Entry::new("article", "Smith2020");
        a.add_field("title", "Foo");
        a.add_field("year", "2020");
        let mut b = Entry::new("article", "Smith2020");
        b.add_field("title", "Foo");
        assert!(a.absorbs(&b));
        assert_eq!(a.field_count(), 2);
    }

    #[test]
    fn test_absorbs_merges_in_richer_entry() {
        let mut a = Entry::new("article", "Smith2020");
        a.add_field("title", "Foo");
        let mut b = Entry::new("article", "Smith2020");
        b.add_field("title", "Foo");
        b.add_field("year", "2020");
        b.add_field("publisher", "X");
        assert!(a.absorbs(&b));
        assert_eq!(a.field("year"), Some("2020"));
        assert_eq!(a.field("publisher"), Some("X"));
        assert_eq!(a.field_count(), 3);
    }

    #[test]
    fn test_absorbs_rejects_conflicting_values() {
        let mut a = Entry::new("article", "Smith2020");
        a.add_field("title", "Foo");
        a.add_field("year", "2020");
        let mut b = Entry::new("article", "Smith2020");
        b.add_field("title", "Foo");
        b.add_field("year", "2021");
        assert!(!a.absorbs(&b));
        assert_eq!(a.field("year"), Some("2020"));
    }

    #[test]
    fn test_absorbs_rejects_overlapping_field_sets() {
        let mut a = Entry::new("article", "Smith2020");
        a.add_field("title", "Foo");
        a.add_field("month", "jan");
        let mut b = Entry::new("article", "Smith2020");
        b.add_field("title", "Foo");
        b.add_field("year", "2020");
        assert!(!a.absorbs(&b));
    }

    #[test]
    fn test_display_orders_fields_and_inlines_notes() {
        let mut entry = Entry::new("article", "foo");
        entry.add_field("year", "2020");
        entry.add_field("title", "{Bar}");
        entry.add_field("keywords", "{x}");
        let expected = "\
% article{foo}
% keywords={x},
@article{foo,
  title={Bar},
  year={2020},
}
";
        assert_eq!(entry.to_string(), expected);
    }

    #[test]
    fn test_display_without_notes_has_no_comment_lines() {
        let mut entry = Entry::new("WebLink", "sep-logic");
        entry.add_field("title", "{Some Encyclopedia}");
        let expected = "\
@misc{sep-logic,
  title={Some Encyclopedia},
}
";
        assert_eq!(entry.to_string(), expected);
    }
}
