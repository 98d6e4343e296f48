//! Event handling.

use crate::event::Event;

/// Trait for consuming events in simulation components.
pub trait EventHandler {
    /// Processes event.
    ///
    /// Handlers never block: any waiting is expressed by emitting an event with a delay.
    fn on(&mut self, event: Event);
}

/// Dispatches an event to one of the listed arms by downcasting its payload to the arm type.
///
/// The arms need not be exhaustive. If the payload matches none of them, the event is logged
/// as unhandled under `ERROR` level and dropped.
#[macro_export]
macro_rules! cast {
    ( match $event:ident.data { $( $type:ident { $($tt:tt)* } => { $($expr:tt)* } )+ } ) => {
        $(
            if $event.data.is::<$type>() {
                if let Ok(__value) = $event.data.downcast::<$type>() {
                    let $type { $($tt)* } = *__value;
                    $($expr)*
                }
            } else
        )*
        {
            $crate::log::log_unhandled_event($event);
        }
    }
}
