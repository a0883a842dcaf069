//! Amazon SQS implementation of `QueueClient`, plus the factory that hands each
//! worker its own SDK client built from one shared AWS configuration.

use crate::queue::client::{QueueClient, QueueClientFactory, QueueError};
use crate::queue::message::{AttributeValue, Message, MessageAttributes};
use crate::queue::options::ReceiveOptions;
use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::primitives::Blob;
use aws_sdk_sqs::types::{Message as SdkMessage, MessageAttributeValue};
use aws_sdk_sqs::Client;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SqsQueueClient {
    client: Client,
}

impl SqsQueueClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self::new(Client::new(config))
    }

    pub async fn receive_batch(
        &self,
        queue: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<Message>> {
        options.validate()?;

        let max_messages =
            i32::try_from(options.max_messages).context("max_messages does not fit in i32")?;
        let wait_time = seconds_i32(options.wait_time).context("wait_time is too large")?;
        let visibility_timeout = options
            .visibility_timeout
            .map(seconds_i32)
            .transpose()
            .context("visibility_timeout is too large")?;

        let mut request = self
            .client
            .receive_message()
            .queue_url(queue)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_time)
            .set_visibility_timeout(visibility_timeout);
        for name in &options.attribute_names {
            request = request.message_attribute_names(name);
        }

        let output = request.send().await.map_err(|err| QueueError::Receive {
            queue: queue.to_owned(),
            reason: DisplayErrorContext(&err).to_string(),
        })?;

        Ok(output
            .messages()
            .iter()
            .filter_map(|message| from_sdk_message(queue, message))
            .collect())
    }

    pub async fn send_message(
        &self,
        queue: &str,
        body: &str,
        attributes: &MessageAttributes,
    ) -> Result<()> {
        let attributes = to_sdk_attributes(attributes)?;
        self.client
            .send_message()
            .queue_url(queue)
            .message_body(body)
            .set_message_attributes(attributes)
            .send()
            .await
            .map_err(|err| QueueError::Send {
                queue: queue.to_owned(),
                reason: DisplayErrorContext(&err).to_string(),
            })?;
        Ok(())
    }

    pub async fn delete_message(&self, queue: &str, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(queue)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|err| QueueError::Delete {
                queue: queue.to_owned(),
                reason: DisplayErrorContext(&err).to_string(),
            })?;
        Ok(())
    }
}

impl QueueClient for SqsQueueClient {
    fn receive<'a>(
        &'a self,
        queue: &'a str,
        options: &'a ReceiveOptions,
    ) -> BoxFuture<'a, Result<Vec<Message>>> {
        Box::pin(self.receive_batch(queue, options))
    }

    fn send<'a>(
        &'a self,
        queue: &'a str,
        body: &'a str,
        attributes: &'a MessageAttributes,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.send_message(queue, body, attributes))
    }

    fn delete<'a>(&'a self, queue: &'a str, receipt_handle: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.delete_message(queue, receipt_handle))
    }
}

/// Shares one resolved AWS configuration (credentials, region, endpoint) and
/// builds a fresh SDK client for every worker.
#[derive(Debug, Clone)]
pub struct SqsClientFactory {
    config: SdkConfig,
}

impl SqsClientFactory {
    pub fn new(config: SdkConfig) -> Self {
        Self { config }
    }

    /// Loads configuration from the default provider chain (environment,
    /// `AWS_PROFILE` shared config, instance metadata).
    pub async fn from_env(region: Option<String>, endpoint_url: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        if let Some(endpoint_url) = endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        Self::new(loader.load().await)
    }
}

impl QueueClientFactory for SqsClientFactory {
    fn create(&self, worker_id: usize) -> Result<Arc<dyn QueueClient>> {
        tracing::debug!(worker = worker_id, "building SQS client");
        Ok(Arc::new(SqsQueueClient::from_sdk_config(&self.config)))
    }
}

fn seconds_i32(duration: Duration) -> Result<i32> {
    Ok(i32::try_from(duration.as_secs())?)
}

fn from_sdk_message(queue: &str, message: &SdkMessage) -> Option<Message> {
    let Some(receipt_handle) = message.receipt_handle() else {
        tracing::warn!(
            queue,
            message_id = message.message_id(),
            "received message without receipt handle; skipping"
        );
        return None;
    };

    let attributes = message
        .message_attributes()
        .map(|attributes| {
            attributes
                .iter()
                .map(|(name, value)| (name.clone(), from_sdk_attribute(value)))
                .collect()
        })
        .unwrap_or_default();

    Some(Message {
        message_id: message.message_id().map(str::to_owned),
        body: message.body().unwrap_or_default().to_owned(),
        attributes,
        receipt_handle: receipt_handle.to_owned(),
    })
}

fn from_sdk_attribute(value: &MessageAttributeValue) -> AttributeValue {
    AttributeValue {
        data_type: value.data_type().to_owned(),
        string_value: value.string_value().map(str::to_owned),
        binary_value: value.binary_value().map(|blob| blob.as_ref().to_vec()),
    }
}

fn to_sdk_attributes(
    attributes: &MessageAttributes,
) -> Result<Option<HashMap<String, MessageAttributeValue>>> {
    if attributes.is_empty() {
        return Ok(None);
    }

    let mut converted = HashMap::with_capacity(attributes.len());
    for (name, value) in attributes {
        let sdk_value = MessageAttributeValue::builder()
            .data_type(&value.data_type)
            .set_string_value(value.string_value.clone())
            .set_binary_value(value.binary_value.clone().map(Blob::new))
            .build()
            .with_context(|| format!("invalid message attribute {name}"))?;
        converted.insert(name.clone(), sdk_value);
    }
    Ok(Some(converted))
}
