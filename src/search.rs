use crate::listing::FileEntry;

/// True when `name` contains `keyword`. An empty keyword matches everything.
///
/// Matching is a plain case-sensitive substring test on the entry name.
pub fn matches_keyword(name: &str, keyword: &str) -> bool {
    keyword.is_empty() || name.contains(keyword)
}

/// Keeps the entries matching `keyword`, preserving their order.
pub fn filter_entries(entries: Vec<FileEntry>, keyword: &str) -> Vec<FileEntry> {
    if keyword.is_empty() {
        return entries;
    }
    entries
        .into_iter()
        .filter(|entry| matches_keyword(&entry.name, keyword))
        .collect()
}
