use burn::data::dataset::Dataset;

/// A fully materialised split. Burn's DataLoader calls
/// `get(index)` and `len()` on it.
pub struct InMemoryDataset<T> {
    items: Vec<T>,
}

impl<T> InMemoryDataset<T> {
    pub fn new(items: Vec<T>) -> Self { Self { items } }
}

impl<T: Clone + Send + Sync> Dataset<T> for InMemoryDataset<T> {
    fn get(&self, index: usize) -> Option<T> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
