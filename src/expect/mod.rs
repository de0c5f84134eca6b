/// 期望模块 - 基于正则的响应校验，仅用于观测
mod matcher;
mod types;

pub use matcher::ExpectationMatcher;
pub use types::{Expectation, ExpectationFailure, Part, PartFailure};
