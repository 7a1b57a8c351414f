use super::*;
use crate::batch::ItemOutcome;
use crate::error::DownloadError;
use crate::export::ExportRequest;
use crate::test_helpers::{
    MockTransport, create_test_client, create_test_client_with_config, export_status, saved,
    test_config,
};
use crate::types::{FileId, LoginResult, ObjectType, QueryOptions, QueryResult, ZObject};
