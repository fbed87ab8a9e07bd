//! Test utilities: mock agents with scripted behaviors.

mod mocks;

pub use mocks::{
    FailingAgent, FlakyAgent, InvalidConfigAgent, PanickingAgent, SlowAgent, SuccessAgent,
};
