#![allow(dead_code)]

pub mod draft_support;
pub mod fixtures;
