
mod client;

pub use client::{ChatClient, LazyChatClient};

use crate::error::Result;

/// A text completion endpoint
///
/// One prompt in, one free-text reply out. No schema-constrained decoding
/// is assumed; callers must cope with prose around any structured output.
pub trait LanguageModel {
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<M: LanguageModel + ?Sized> LanguageModel for &M {
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

impl<M: LanguageModel + ?Sized> LanguageModel for Box<M> {
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}
