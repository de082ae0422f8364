/// Integration tests against an on-disk database

mod command_workflow;
mod storage_properties;
