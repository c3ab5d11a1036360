//! Edge case tests for faxc-gen
