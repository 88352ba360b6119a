use super::clearer::{ReviewKey, ReviewTable, ScanPage};
use crate::error::{Result, SimError};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, WriteRequest};
use aws_sdk_dynamodb::Client;
use log::info;
use std::collections::HashMap;

type Item = HashMap<String, AttributeValue>;

const REVIEW_ID: &str = "review_id";
const PRODUCT_ID: &str = "product_id";

/// Review table stored in DynamoDB, keyed by `review_id` + `product_id`.
pub struct DynamoReviewTable {
    client: Client,
    table_name: String,
}

impl DynamoReviewTable {
    pub fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }

    /// Client configured from the usual AWS environment, profile and region chain.
    pub async fn from_env(table_name: &str) -> Self {
        info!("using aws dynamodb client for table {}", table_name);
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), table_name)
    }
}

fn string_attr(item: &Item, name: &str) -> Result<String> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or_else(|| SimError::Table(format!("item has no string attribute {}", name)))
}

fn key_from_item(item: &Item) -> Result<ReviewKey> {
    Ok(ReviewKey {
        review_id: string_attr(item, REVIEW_ID)?,
        product_id: string_attr(item, PRODUCT_ID)?,
    })
}

fn item_from_key(key: &ReviewKey) -> Item {
    HashMap::from([
        (REVIEW_ID.to_string(), AttributeValue::S(key.review_id.clone())),
        (PRODUCT_ID.to_string(), AttributeValue::S(key.product_id.clone())),
    ])
}

#[async_trait]
impl ReviewTable for DynamoReviewTable {
    type Cursor = Item;

    async fn scan_page(&self, start: Option<Item>) -> Result<ScanPage<Item>> {
        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .set_exclusive_start_key(start)
            .send()
            .await
            .map_err(|e| SimError::Table(DisplayErrorContext(&e).to_string()))?;

        let keys = output
            .items()
            .iter()
            .map(key_from_item)
            .collect::<Result<Vec<_>>>()?;

        Ok(ScanPage {
            keys,
            next: output.last_evaluated_key().cloned(),
        })
    }

    async fn delete_batch(&self, keys: &[ReviewKey]) -> Result<Vec<ReviewKey>> {
        let mut requests = Vec::with_capacity(keys.len());
        for key in keys {
            let delete = DeleteRequest::builder()
                .set_key(Some(item_from_key(key)))
                .build()
                .map_err(|e| SimError::Table(e.to_string()))?;
            requests.push(WriteRequest::builder().delete_request(delete).build());
        }

        let output = self
            .client
            .batch_write_item()
            .request_items(&self.table_name, requests)
            .send()
            .await
            .map_err(|e| SimError::Table(DisplayErrorContext(&e).to_string()))?;

        let unprocessed = output
            .unprocessed_items()
            .and_then(|items| items.get(&self.table_name))
            .map(|requests| {
                requests
                    .iter()
                    .filter_map(|r| r.delete_request())
                    .map(|d| key_from_item(d.key()))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(unprocessed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trip_through_item() {
        let key = ReviewKey {
            review_id: "abc-123".to_string(),
            product_id: "prod0042".to_string(),
        };
        assert_eq!(key_from_item(&item_from_key(&key)).unwrap(), key);
    }

    #[test]
    fn test_item_without_review_id_is_rejected() {
        let item = HashMap::from([(
            PRODUCT_ID.to_string(),
            AttributeValue::S("prod0001".to_string()),
        )]);
        assert!(matches!(key_from_item(&item), Err(SimError::Table(_))));
    }

    #[test]
    fn test_numeric_key_is_rejected() {
        let item = HashMap::from([
            (REVIEW_ID.to_string(), AttributeValue::N("7".to_string())),
            (PRODUCT_ID.to_string(), AttributeValue::S("prod0001".to_string())),
        ]);
        assert!(key_from_item(&item).is_err());
    }
}
