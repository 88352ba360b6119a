use crate::error::Result;
use async_trait::async_trait;
use log::{info, warn};
use std::collections::VecDeque;

/// Largest number of deletes the store accepts in one batch write.
pub const MAX_BATCH_SIZE: usize = 25;

/// Primary key of a stored review.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReviewKey {
    pub review_id: String,
    pub product_id: String,
}

/// One page of a table scan. `next` is the cursor to resume from, `None` once
/// the scan is exhausted.
#[derive(Debug)]
pub struct ScanPage<C> {
    pub keys: Vec<ReviewKey>,
    pub next: Option<C>,
}

/// Remote table of reviews that can be scanned page by page and deleted from
/// in batches.
#[async_trait]
pub trait ReviewTable: Send + Sync {
    type Cursor: Send;

    async fn scan_page(&self, start: Option<Self::Cursor>) -> Result<ScanPage<Self::Cursor>>;

    /// Delete `keys`, returning the keys the store left unprocessed.
    async fn delete_batch(&self, keys: &[ReviewKey]) -> Result<Vec<ReviewKey>>;
}

/// Follow the scan cursor until the table reports no further pages.
pub async fn scan_all<T: ReviewTable>(table: &T) -> Result<Vec<ReviewKey>> {
    let mut page = table.scan_page(None).await?;
    let mut keys = std::mem::take(&mut page.keys);

    while let Some(cursor) = page.next.take() {
        page = table.scan_page(Some(cursor)).await?;
        keys.append(&mut page.keys);
        info!("Scanned {} items so far", keys.len());
    }

    Ok(keys)
}

/// Remove every item from the table. Returns the number of items deleted.
pub async fn clear_table<T: ReviewTable>(table: &T, name: &str) -> Result<usize> {
    println!("Scanning table {}...", name);
    let keys = scan_all(table).await?;
    let total = keys.len();

    let mut queue: VecDeque<ReviewKey> = VecDeque::with_capacity(total);
    for key in keys {
        println!("Deleting item: {}", key.review_id);
        queue.push_back(key);
    }

    while !queue.is_empty() {
        let take = queue.len().min(MAX_BATCH_SIZE);
        let batch: Vec<ReviewKey> = queue.drain(..take).collect();
        let unprocessed = table.delete_batch(&batch).await?;
        if !unprocessed.is_empty() {
            warn!("{} deletes left unprocessed, resubmitting", unprocessed.len());
            queue.extend(unprocessed);
        }
    }

    println!("Successfully deleted {} items from {}", total, name);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use parking_lot::Mutex;

    /// Table that pages its contents and can leave the first few deletes unprocessed.
    struct MemoryTable {
        items: Mutex<Vec<ReviewKey>>,
        page_size: usize,
        batches: Mutex<Vec<usize>>,
        scans: Mutex<usize>,
        unprocessed_budget: Mutex<usize>,
    }

    impl MemoryTable {
        fn with_items(count: usize, page_size: usize) -> Self {
            let items = (0..count)
                .map(|i| ReviewKey {
                    review_id: format!("r{}", i),
                    product_id: format!("prod{:04}", i),
                })
                .collect();
            Self {
                items: Mutex::new(items),
                page_size,
                batches: Mutex::new(Vec::new()),
                scans: Mutex::new(0),
                unprocessed_budget: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ReviewTable for MemoryTable {
        type Cursor = usize;

        async fn scan_page(&self, start: Option<usize>) -> Result<ScanPage<usize>> {
            *self.scans.lock() += 1;
            let items = self.items.lock();
            let from = start.unwrap_or(0);
            let to = (from + self.page_size).min(items.len());
            Ok(ScanPage {
                keys: items[from..to].to_vec(),
                next: (to < items.len()).then_some(to),
            })
        }

        async fn delete_batch(&self, keys: &[ReviewKey]) -> Result<Vec<ReviewKey>> {
            if keys.len() > MAX_BATCH_SIZE {
                return Err(SimError::Table("batch too large".to_string()));
            }
            self.batches.lock().push(keys.len());

            let mut budget = self.unprocessed_budget.lock();
            let skip = (*budget).min(keys.len());
            *budget -= skip;
            let (left, done) = keys.split_at(skip);

            self.items.lock().retain(|item| !done.contains(item));
            Ok(left.to_vec())
        }
    }

    #[tokio::test]
    async fn test_scan_follows_cursor() {
        let table = MemoryTable::with_items(10, 3);
        let keys = scan_all(&table).await.unwrap();
        assert_eq!(keys.len(), 10);
        assert_eq!(*table.scans.lock(), 4);
    }

    #[tokio::test]
    async fn test_clear_deletes_everything_in_bounded_batches() {
        let table = MemoryTable::with_items(60, 7);
        let deleted = clear_table(&table, "reviews").await.unwrap();

        assert_eq!(deleted, 60);
        assert!(table.items.lock().is_empty());
        assert_eq!(*table.batches.lock(), vec![25, 25, 10]);
    }

    #[tokio::test]
    async fn test_unprocessed_keys_are_resubmitted() {
        let table = MemoryTable::with_items(30, 50);
        *table.unprocessed_budget.lock() = 4;

        let deleted = clear_table(&table, "reviews").await.unwrap();
        assert_eq!(deleted, 30);
        assert!(table.items.lock().is_empty());
        assert_eq!(table.batches.lock().iter().sum::<usize>(), 34);
    }

    #[tokio::test]
    async fn test_clear_empty_table() {
        let table = MemoryTable::with_items(0, 5);
        assert_eq!(clear_table(&table, "reviews").await.unwrap(), 0);
        assert!(table.batches.lock().is_empty());
    }
}
