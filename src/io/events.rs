/// Notifications delivered by the store subscription to the bridge loop.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagEvent {
    /// The watched node changed. `None` when the node is absent, null,
    /// or not a boolean.
    FlagChanged(Option<bool>),
    SubscriptionError(String),
}
