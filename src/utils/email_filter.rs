use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use std::sync::{PoisonError, RwLock};
use tracing::info;

use crate::store::EmployeeStore;

/// Expected capacity and false-positive rate.
/// Tune these based on real employee counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Probabilistic set of registered emails.
///
/// `might_exist == false` is a definite answer and lets registration skip the
/// lookup; a positive still needs the store. The unique index stays the real guard,
/// so a filter that is still warming up only costs an extra failed insert.
pub struct EmailFilter {
    inner: RwLock<CuckooFilter<String>>,
}

impl Default for EmailFilter {
    fn default() -> Self {
        Self {
            inner: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
        }
    }
}

#[inline]
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

impl EmailFilter {
    /// Check if an email might be registered (false positives possible)
    pub fn might_exist(&self, email: &str) -> bool {
        let email = normalize(email);
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&email)
    }

    pub fn insert(&self, email: &str) {
        let email = normalize(email);
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&email);
    }

    /// Insert a batch of normalized emails
    fn insert_batch(&self, emails: &[String]) {
        let mut filter = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        for email in emails {
            filter.add(email);
        }
    }

    /// Warm up the filter by streaming every stored email in batches.
    pub async fn warmup(&self, store: &dyn EmployeeStore, batch_size: usize) -> Result<usize> {
        let mut stream = store.emails();

        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(row) = stream.next().await {
            let email = row.map_err(|e| anyhow!("email fetch failed: {}", e))?;

            batch.push(normalize(&email));
            total += 1;

            if batch.len() == batch_size {
                self.insert_batch(&batch);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.insert_batch(&batch);
        }

        info!(total, "Email filter warmup complete");
        Ok(total)
    }
}
