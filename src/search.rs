use crate::api::ContentItem;

/// Case-insensitive substring match on the item name. An empty needle
/// matches everything.
pub fn matches(item: &ContentItem, needle: &str) -> bool {
  needle.is_empty() || item.name.to_lowercase().contains(needle)
}

/// Indices into `items` whose names contain `term`, in list order.
pub fn filter_indices(items: &[ContentItem], term: &str) -> Vec<usize> {
  let needle = term.to_lowercase();
  if needle.is_empty() {
    return (0..items.len()).collect();
  }
  items.iter().enumerate().filter(|(_, item)| matches(item, &needle)).map(|(i, _)| i).collect()
}
