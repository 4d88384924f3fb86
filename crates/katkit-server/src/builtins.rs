//! Requests every device answers.

use crate::handler::{HandlerError, HandlerResult, RequestContext, RequestHandler};
use crate::restart::RestartRequest;
use katkit_core::protocol::OK;
use katkit_core::{Message, Sensor};
use tracing::info;

/// The built-in request handlers.
pub(crate) fn handlers() -> Vec<RequestHandler> {
    vec![
        RequestHandler::new(
            "help",
            "Return help on the available requests.",
            help,
        ),
        RequestHandler::new(
            "sensor-list",
            "Request the list of sensors.",
            sensor_list,
        ),
        RequestHandler::new(
            "sensor-value",
            "Request the value of a sensor or sensors.",
            sensor_value,
        ),
        RequestHandler::new("watchdog", "Check that the device is still alive.", watchdog),
        RequestHandler::new("restart", "Restart the device server.", restart),
    ]
}

fn selected_sensors(ctx: &RequestContext<'_>, msg: &Message) -> Result<Vec<Sensor>, HandlerError> {
    match msg.argument(0) {
        Some(name) => ctx
            .server
            .sensors()
            .get(name)
            .map(|sensor| vec![sensor])
            .ok_or_else(|| HandlerError::fail(format!("Unknown sensor name: {name}."))),
        None => Ok(ctx.server.sensors().list()),
    }
}

fn sensor_value(ctx: &RequestContext<'_>, msg: &Message) -> HandlerResult {
    let sensors = selected_sensors(ctx, msg)?;
    for sensor in &sensors {
        ctx.reply_inform(Message::reply_inform(msg).args(sensor.value_arguments()), msg);
    }
    Ok(Message::reply_to(msg).args([OK.to_string(), sensors.len().to_string()]))
}

fn sensor_list(ctx: &RequestContext<'_>, msg: &Message) -> HandlerResult {
    let sensors = selected_sensors(ctx, msg)?;
    for sensor in &sensors {
        ctx.reply_inform(Message::reply_inform(msg).args(sensor.list_arguments()), msg);
    }
    Ok(Message::reply_to(msg).args([OK.to_string(), sensors.len().to_string()]))
}

fn help(ctx: &RequestContext<'_>, msg: &Message) -> HandlerResult {
    let handlers: Vec<&RequestHandler> = match msg.argument(0) {
        Some(name) => vec![
            ctx.server
                .handler(name)
                .ok_or_else(|| HandlerError::fail(format!("Unknown request method: {name}.")))?,
        ],
        None => ctx.server.handlers().collect(),
    };
    for handler in &handlers {
        ctx.reply_inform(
            Message::reply_inform(msg).args([handler.name(), handler.description()]),
            msg,
        );
    }
    Ok(Message::reply_to(msg).args([OK.to_string(), handlers.len().to_string()]))
}

fn watchdog(_ctx: &RequestContext<'_>, msg: &Message) -> HandlerResult {
    Ok(Message::reply_to(msg).arg(OK))
}

fn restart(ctx: &RequestContext<'_>, msg: &Message) -> HandlerResult {
    let sender = ctx
        .server
        .restart_sender()
        .ok_or_else(|| HandlerError::fail("No restart queue registered; cannot restart."))?;
    sender
        .send(RestartRequest {
            connection_id: ctx.connection.id(),
        })
        .map_err(|_| HandlerError::fail("Restart queue closed; cannot restart."))?;
    info!(device = %ctx.server.name(), connection = ctx.connection.id(), "restart requested");
    Ok(Message::reply_to(msg).arg(OK))
}
