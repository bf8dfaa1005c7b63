use std::sync::mpsc::Sender;
use std::thread;

use crate::app::{AppEvent, ExecEvent};
use crate::error::DeskError;
use crate::model::{InstanceId, OrderRequest, TradeDraft, TradeLeg};
use crate::rest::DeskClient;

/// A backend request issued from the desk.
#[derive(Clone, Debug)]
pub enum DeskCommand {
    LoadInstances,
    LoadTrades { instance: InstanceId },
    AddTrade { instance: InstanceId, draft: TradeDraft },
    EditTrade { trade_id: String, draft: TradeDraft },
    DeleteTrade { instance: InstanceId, trade_id: String },
    PlaceOrder(OrderRequest),
    CancelOrder { order_id: String },
    PartialClose { leg: TradeLeg, quantity: u32 },
}

impl DeskCommand {
    pub fn label(&self) -> String {
        match self {
            DeskCommand::LoadInstances => "load instances".to_string(),
            DeskCommand::LoadTrades { instance } => format!("load trades {instance}"),
            DeskCommand::AddTrade { instance, draft } => format!(
                "add {} {}{} x{} to {instance}",
                draft.side.as_str(),
                draft.strike,
                draft.option_type.as_str(),
                draft.quantity
            ),
            DeskCommand::EditTrade { trade_id, .. } => format!("edit trade {trade_id}"),
            DeskCommand::DeleteTrade { trade_id, .. } => format!("delete trade {trade_id}"),
            DeskCommand::PlaceOrder(o) => {
                format!("{} {} x{} on {}", o.side.as_str(), o.trade_id, o.quantity, o.instance_id)
            }
            DeskCommand::CancelOrder { order_id } => format!("cancel order {order_id}"),
            DeskCommand::PartialClose { leg, quantity } => {
                format!("close {quantity}/{} of trade {}", leg.quantity, leg.id)
            }
        }
    }
}

/// Requests that should follow an event coming back from the backend.
///
/// A fresh instance list pulls each instance's legs.
pub fn follow_up(ev: &AppEvent) -> Vec<DeskCommand> {
    match ev {
        AppEvent::Exec(ExecEvent::InstancesLoaded { instances }) => instances
            .iter()
            .map(|i| DeskCommand::LoadTrades { instance: i.id.clone() })
            .collect(),
        _ => Vec::new(),
    }
}

/// Run `cmd` on a worker thread and report the outcome on `tx`.
pub fn spawn_command(tx: Sender<AppEvent>, client: DeskClient, cmd: DeskCommand) {
    thread::spawn(move || {
        let ev = run_command(&client, cmd);
        let _ = tx.send(AppEvent::Exec(ev));
    });
}

pub fn run_command(client: &DeskClient, cmd: DeskCommand) -> ExecEvent {
    let label = cmd.label();
    let outcome: Result<ExecEvent, DeskError> = match cmd {
        DeskCommand::LoadInstances => client
            .list_instances()
            .map(|instances| ExecEvent::InstancesLoaded { instances }),
        DeskCommand::LoadTrades { instance } => client
            .list_trades(&instance)
            .map(|legs| ExecEvent::TradesLoaded { instance, legs }),
        DeskCommand::AddTrade { instance, draft } => client
            .add_trade(&instance, &draft)
            .map(|leg| ExecEvent::TradeUpserted { label: label.clone(), leg }),
        DeskCommand::EditTrade { trade_id, draft } => client
            .edit_trade(&trade_id, &draft)
            .map(|leg| ExecEvent::TradeUpserted { label: label.clone(), leg }),
        DeskCommand::DeleteTrade { instance, trade_id } => client
            .delete_trade(&trade_id)
            .map(|_| ExecEvent::TradeDeleted { instance, trade_id }),
        DeskCommand::PlaceOrder(order) => client.place_order(&order).map(|ack| ExecEvent::Done {
            label: label.clone(),
            message: format!("order {} {}", ack.order_id, ack.status),
        }),
        DeskCommand::CancelOrder { order_id } => {
            client.cancel_order(&order_id).map(|ack| ExecEvent::Done {
                label: label.clone(),
                message: format!("order {} {}", ack.order_id, ack.status),
            })
        }
        DeskCommand::PartialClose { leg, quantity } => client
            .partial_close(&leg, quantity)
            .map(|leg| ExecEvent::TradeUpserted { label: label.clone(), leg }),
    };

    match outcome {
        Ok(ev) => {
            crate::debug_hooks::log_exec(&label, true, "");
            ev
        }
        Err(err) => {
            crate::debug_hooks::log_exec(&label, false, &err.to_string());
            ExecEvent::Failed {
                label,
                unauthorized: matches!(err, DeskError::Unauthorized(_)),
                message: err.to_string(),
            }
        }
    }
}
