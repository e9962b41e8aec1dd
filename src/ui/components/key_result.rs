/// Generic result type for component key handling.
///
/// Components return this to their parent view: the key was swallowed, it
/// produced an event the view must act on, or the view should try it next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, no event for parent to handle
  Handled,
  /// Key was consumed, here's an event for parent to process
  Event(T),
  /// Key was not consumed, parent should try next handler
  NotHandled,
}
