use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};

use crate::entry::Entry;
use crate::parsing::RawEntry;

// What a citation key maps to: one canonical entry, or the variants that
// share the key without being the same record.
#[derive(Debug)]
pub enum Slot {
    Unique(Entry),
    Conflicted(Vec<Entry>),
}

// All entries of the file, keyed by lowercased citation key.
#[derive(Debug)]
pub struct EntryTable {
    slots: HashMap<String, Slot>,
}

impl EntryTable {
    pub fn new() -> EntryTable {
        EntryTable {
            slots: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Slot> {
        self.slots.get(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    // Files an entry under its lowercased key. An entry equal to what is
    // already there is dropped (after the stored side absorbed whatever extra
    // fields it brought); a genuinely different entry turns the slot into a
    // conflict list, or extends one.
    pub fn add(&mut self, mut entry: Entry) {
        let key = entry.cite_key().to_lowercase();
        match self.slots.remove(&key) {
            None => {
                self.slots.insert(key, Slot::Unique(entry));
            }
            Some(Slot::Unique(mut stored)) => {
                if stored.absorbs(&entry) {
                    self.slots.insert(key, Slot::Unique(stored));
                } else {
                    self.slots.insert(key, Slot::Conflicted(vec![stored, entry]));
                }
            }
            Some(Slot::Conflicted(mut variants)) => {
                if !variants.iter().any(|prev| entry.absorbs(prev)) {
                    variants.push(entry);
                }
                self.slots.insert(key, Slot::Conflicted(variants));
            }
        }
    }

    fn into_sorted(self) -> Vec<(String, Slot)> {
        let mut slots: Vec<(String, Slot)> = self.slots.into_iter().collect();
        slots.sort_by(|a, b| a.0.cmp(&b.0));
        slots
    }
}

// Builds model entries out of the raw scanned tuples, in file order. Entries
// that end up with no usable fields at all are dropped here.
pub fn build_table(raw_entries: Vec<RawEntry>) -> EntryTable {
    let mut table = EntryTable::new();
    for raw in raw_entries {
        let mut entry = Entry::new(&raw.entry_type, &raw.cite_key);
        for (name, value) in &raw.fields {
            entry.add_field(name, value);
        }
        if !entry.has_fields() {
            println!(
                "@{}{{{}}} is empty, skipping it",
                entry.entry_type(),
                entry.cite_key()
            );
            continue;
        }
        table.add(entry);
    }
    table
}

// The two rendered output documents plus their entry counts.
pub struct Output {
    pub unique: String,
    pub unique_count: usize,
    pub duplicates: String,
    pub duplicate_keys: usize,
    pub duplicate_count: usize,
}

// Renders both documents in sorted key order. Unique slots go to one
// document, every variant of a conflicted slot to the other.
pub fn render_output(table: EntryTable) -> Output {
    let mut output = Output {
        unique: String::new(),
        unique_count: 0,
        duplicates: String::new(),
        duplicate_keys: 0,
        duplicate_count: 0,
    };
    for (_, slot) in table.into_sorted() {
        match slot {
            Slot::Unique(entry) => {
                output.unique.push_str(&entry.to_string());
                output.unique_count += 1;
            }
            Slot::Conflicted(variants) => {
                output.duplicate_keys += 1;
                for entry in variants {
                    output.duplicates.push_str(&entry.to_string());
                    output.duplicate_count += 1;
                }
            }
        }
    }
    output
}

// Writes <prefix>.bib and <prefix>_duplicates.bib. A file that would come out
// with zero entries is not created at all.
pub fn write_output(table: EntryTable, prefix: &str) -> Result<()> {
    println!("Creating output files");
    let output = render_output(table);

    let unique_path = format!("{}.bib", prefix);
    if output.unique_count == 0 {
        bunt::println!("{$yellow}No unique entries to write to {}{/$}", unique_path);
    } else {
        fs::write(&unique_path, &output.unique)
            .with_context(|| format!("could not write {}", unique_path))?;
        bunt::println!(
            "{$green}Created {} with {} unique entries{/$}",
            unique_path,
            output.unique_count
        );
    }

    let duplicates_path = format!("{}_duplicates.bib", prefix);
    if output.duplicate_count == 0 {
        bunt::println!(
            "{$yellow}No duplicate entries to write to {}{/$}",
            duplicates_path
        );
    } else {
        fs::write(&duplicates_path, &output.duplicates)
            .with_context(|| format!("could not write {}", duplicates_path))?;
        bunt::println!(
            "{$green}Created {} with {} conflicting keys and {} entries in total{/$}",
            duplicates_path,
            output.duplicate_keys,
            output.duplicate_count
        );
    }
    Ok(())
}
