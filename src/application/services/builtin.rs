use std::sync::Arc;

use crate::application::errors::HandlerError;
use crate::application::messaging::Handler;
use crate::application::robot::Robot;

/// Register the handlers every robot answers to
pub fn register_defaults(robot: &Robot) -> Result<(), HandlerError> {
    robot.handle(
        Handler::respond("ping$", |res| async move { res.send("PONG").await })?
            .with_usage("ping - Reply with PONG"),
    );

    robot.handle(
        Handler::respond("echo (.+)$", |res| async move {
            let text = res.match_at(1).unwrap_or_default().to_string();
            res.reply(text).await
        })?
        .with_usage("echo <text> - Reply back with <text>"),
    );

    robot.handle(
        Handler::respond("version$", |res| async move {
            res.send(format!("hal-hipchat v{}", env!("CARGO_PKG_VERSION"))).await
        })?
        .with_usage("version - Show bot version"),
    );

    robot.handle(
        Handler::respond("help$", |res| async move {
            let text = help_text(&res.robot().handlers());
            res.send(text).await
        })?
        .with_usage("help - List available commands"),
    );

    Ok(())
}

/// One usage line per handler that documents itself
pub fn help_text(handlers: &[Arc<Handler>]) -> String {
    let mut help = "Available commands:".to_string();
    for usage in handlers.iter().filter_map(|h| h.usage.as_deref()) {
        help.push_str(&format!("\n  {}", usage));
    }
    help
}
