#![forbid(unsafe_code)]

//! Non-fatal policy warnings.

use crate::config;

/// Report a policy violation.
///
/// A configured `warn_handler` receives the message; otherwise a `WARN`
/// event is emitted unless the configuration is silent.
pub(crate) fn warn(message: &str) {
    let config = config::current();
    if let Some(handler) = config.warn_handler {
        handler(message);
    } else if !config.silent {
        tracing::warn!(target: "weft::observer", "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReactivityConfig, override_config};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn handler_receives_message() {
        let seen = Rc::new(RefCell::new(Vec::<String>::new()));
        let sink = Rc::clone(&seen);
        let _cfg = override_config(
            ReactivityConfig::default().with_warn_handler(move |m| sink.borrow_mut().push(m.into())),
        );
        warn("first");
        warn("second");
        assert_eq!(*seen.borrow(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn handler_runs_even_when_silent() {
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        let _cfg = override_config(
            ReactivityConfig::default()
                .with_silent(true)
                .with_warn_handler(move |_| *sink.borrow_mut() += 1),
        );
        warn("still delivered");
        assert_eq!(*seen.borrow(), 1);
    }
}
