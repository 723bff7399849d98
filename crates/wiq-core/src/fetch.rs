//! Fetch instructions for the external work item source.
//!
//! Fetching happens outside this tool. We only plan the batches and describe
//! each request; the response is fed back through `wiq cache save`.

use crate::config::Config;
use serde::Serialize;

/// One batch lookup: ids plus the explicit field list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchRequest {
    /// 1-based batch number.
    pub batch: usize,
    pub project: String,
    pub ids: Vec<u64>,
    pub fields: Vec<String>,
}

impl FetchRequest {
    /// Request body for the work items batch endpoint.
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({
            "ids": self.ids,
            "fields": self.fields,
        })
    }

    pub fn describe(&self) -> String {
        let ids: Vec<String> = self.ids.iter().map(u64::to_string).collect();
        format!(
            "Batch {} ({} items): [{}]",
            self.batch,
            self.ids.len(),
            ids.join(", ")
        )
    }
}

/// Split `ids` into batches of `config.cache.batch_size` (at least one id per
/// batch), in ascending id order.
pub fn plan_fetch(ids: &[u64], config: &Config) -> Vec<FetchRequest> {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let size = config.cache.batch_size.max(1);
    sorted
        .chunks(size)
        .enumerate()
        .map(|(i, chunk)| FetchRequest {
            batch: i + 1,
            project: config.project.name.clone(),
            ids: chunk.to_vec(),
            fields: config.fields.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_of_configured_size() {
        let mut config = Config::new("Proj");
        config.cache.batch_size = 2;
        let ids: Vec<u64> = vec![5, 1, 3, 2, 4, 3];
        let plan = plan_fetch(&ids, &config);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].ids, vec![1, 2]);
        assert_eq!(plan[2].ids, vec![5]);
        assert_eq!(plan[2].batch, 3);
        assert_eq!(plan[0].project, "Proj");
        assert_eq!(plan[0].fields, config.fields);
    }

    #[test]
    fn default_batch_is_fifty() {
        let config = Config::new("Proj");
        let ids: Vec<u64> = (1..=120).collect();
        let plan = plan_fetch(&ids, &config);
        let sizes: Vec<usize> = plan.iter().map(|r| r.ids.len()).collect();
        assert_eq!(sizes, vec![50, 50, 20]);
    }

    #[test]
    fn nothing_to_fetch() {
        assert!(plan_fetch(&[], &Config::new("Proj")).is_empty());
    }

    #[test]
    fn describe_and_body() {
        let config = Config::new("Proj");
        let plan = plan_fetch(&[7, 9], &config);
        assert_eq!(plan[0].describe(), "Batch 1 (2 items): [7, 9]");
        let body = plan[0].body();
        assert_eq!(body["ids"], serde_json::json!([7, 9]));
        assert!(body["fields"].as_array().is_some_and(|f| !f.is_empty()));
    }
}
