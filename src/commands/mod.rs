pub mod apply;
pub mod check;
pub mod plan;
pub mod render;

use crate::ui;
use declarative::{Action, ExecutionPlan};

/// Print why a plan will be rejected, if it will
fn show_rejection(plan: &ExecutionPlan) {
    if let Some(Action::FatalError { message, details }) = plan.fatal_error() {
        println!();
        ui::error(message);
        for line in details {
            ui::dim(line);
        }
    }
}
