// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! The activation-listener capability of attribute values.
//!
//! Attribute values are opaque, application-supplied objects. Some of them
//! want to observe session passivation and activation (to drop or reacquire
//! resources that must not be serialized); they advertise that through
//! [`SessionValue::activation_aware`]. Values without the capability are
//! simply skipped during lifecycle dispatch.

/// Callbacks invoked around passivation and activation of a session.
pub trait ActivationAware {
    /// Invoked before the value's session is passivated.
    fn on_pre_passivate(&self);

    /// Invoked after the value's session is activated.
    fn on_post_activate(&self);
}

/// An attribute value that may expose the activation-listener capability.
///
/// The default implementation exposes nothing, which is correct for plain
/// data values.
pub trait SessionValue: Send + Sync {
    /// Returns the value's activation callbacks, when it has any.
    fn activation_aware(&self) -> Option<&dyn ActivationAware> {
        None
    }
}

macro_rules! plain_session_value {
    ($($ty:ty),* $(,)?) => {
        $(impl SessionValue for $ty {})*
    };
}

plain_session_value!(bool, i32, i64, u32, u64, f32, f64, String);

#[cfg(feature = "json")]
impl SessionValue for serde_json::Value {}
