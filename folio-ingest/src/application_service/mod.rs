pub mod change_classifier;
pub mod ingest_node;
pub mod webhook_receiver;

pub use change_classifier::{ChangeClassifier, ContentLayout, FetchedChange, Route};
pub use webhook_receiver::{Notification, ReceiveError, WebhookReceiver};
