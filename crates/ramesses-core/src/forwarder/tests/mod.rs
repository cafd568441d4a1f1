use super::*;
use crate::clock::{Clock, ManualClock};
use crate::error::{DeliveryError, StorageError};
use crate::message::Message;
use crate::storage::RocksDbStorage;
use std::sync::atomic::Ordering;
use std::time::Duration;

mod common;
use common::*;

mod worker;
