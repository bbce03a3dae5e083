//! Kitchen tickets ("comandas").

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write as _;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::entities::{order, order_item};
use crate::models::order_status::ServiceType;

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("printer unavailable: {0}")]
    Unavailable(String),
    #[error("failed to render ticket: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketLine {
    pub quantity: i32,
    pub name: String,
    /// (section name, chosen option names)
    pub sections: Vec<(String, Vec<String>)>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KitchenTicket {
    pub order_id: Uuid,
    pub order_number: String,
    pub service_type: ServiceType,
    pub customer_name: String,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub lines: Vec<TicketLine>,
    pub total: Decimal,
    pub placed_at: DateTime<Utc>,
}

impl KitchenTicket {
    pub fn new(order: &order::Model, items: &[order_item::Model]) -> Self {
        let lines = items
            .iter()
            .map(|item| TicketLine {
                quantity: item.quantity,
                name: item.name.clone(),
                sections: item
                    .sections()
                    .into_iter()
                    .map(|section| {
                        let names = section.options.into_iter().map(|o| o.name).collect();
                        (section.section_name, names)
                    })
                    .collect(),
                notes: item.notes.clone(),
            })
            .collect();

        Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            service_type: order.service_type,
            customer_name: order.customer_name.clone(),
            delivery_address: order.delivery_address.clone(),
            notes: order.notes.clone(),
            lines,
            total: order.total,
            placed_at: order.created_at,
        }
    }

    /// Plain-text layout for thermal printers.
    pub fn render(&self) -> Result<String, PrintError> {
        let mut out = String::new();
        let render = |e: std::fmt::Error| PrintError::Render(e.to_string());

        writeln!(out, "ORDER {}", self.order_number).map_err(render)?;
        writeln!(
            out,
            "{} | {}",
            self.service_type.to_string().to_uppercase(),
            self.placed_at.format("%Y-%m-%d %H:%M")
        )
        .map_err(render)?;
        writeln!(out, "Customer: {}", self.customer_name).map_err(render)?;
        if let Some(address) = &self.delivery_address {
            writeln!(out, "Deliver to: {}", address).map_err(render)?;
        }
        writeln!(out, "--------------------------------").map_err(render)?;
        for line in &self.lines {
            writeln!(out, "{} x {}", line.quantity, line.name).map_err(render)?;
            for (section, options) in &line.sections {
                writeln!(out, "   {}: {}", section, options.join(", ")).map_err(render)?;
            }
            if let Some(notes) = &line.notes {
                writeln!(out, "   * {}", notes).map_err(render)?;
            }
        }
        writeln!(out, "--------------------------------").map_err(render)?;
        if let Some(notes) = &self.notes {
            writeln!(out, "NOTES: {}", notes).map_err(render)?;
        }
        writeln!(out, "TOTAL {}", self.total).map_err(render)?;
        Ok(out)
    }
}

#[async_trait]
pub trait PrintService: Send + Sync {
    async fn print(&self, ticket: &KitchenTicket) -> Result<(), PrintError>;
}

/// Writes tickets to the structured log.
#[derive(Debug, Default, Clone)]
pub struct TracingPrintService;

#[async_trait]
impl PrintService for TracingPrintService {
    async fn print(&self, ticket: &KitchenTicket) -> Result<(), PrintError> {
        let text = ticket.render()?;
        info!(
            order_id = %ticket.order_id,
            order_number = %ticket.order_number,
            lines = ticket.lines.len(),
            "kitchen ticket\n{}",
            text
        );
        Ok(())
    }
}
