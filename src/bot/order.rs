//! The Lovely Gloves order flow: which slots to collect and what to say when
//! the order is complete.

use serde::Deserialize;

use crate::dialogs::{
    DialogSet, FoundChoice, SlotDefinition, SlotFillingDialog, StepDirective, WaterfallDialog,
    WaterfallStepContext,
};
use crate::error::DialogError;

/// Id of the top-level waterfall begun when no dialog is active.
pub const ROOT_DIALOG_ID: &str = "root";

/// Id of the slot-filling dialog that collects the order.
pub const SLOT_DIALOG_ID: &str = "slot-dialog";

/// Available glove colors, in the order they are offered.
pub const COLORS: [&str; 3] = ["Желтый", "Зеленый", "Синий"];

/// The fields of an order, asked in this order.
pub fn order_slots() -> Vec<SlotDefinition> {
    vec![
        SlotDefinition::choice("color", "Пожалуйста выберите цвет.", COLORS)
            .with_retry("Вы должны выбрать."),
        SlotDefinition::text("fullname", "Пожалуйста введите полное имя."),
        SlotDefinition::text("city", "Пожалуйста введите ваш город."),
        SlotDefinition::number(
            "warehouse",
            "Пожалуйста введите номер отделения Новой Почты.",
        ),
    ]
}

/// A completed order, read back from the slot-filling result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Order {
    pub color: FoundChoice,
    pub fullname: String,
    pub city: String,
    pub warehouse: serde_json::Number,
}

impl Order {
    /// Confirmation sent to the customer.
    pub fn confirmation(&self) -> String {
        format!(
            "Ваш заказ 'Перчатки Lovely Gloves (цвет {})' принят в обработку и будет доставлен \
             в отделение Новой Почты №{} города {}, получатель {}",
            self.color.value, self.warehouse, self.city, self.fullname
        )
    }
}

fn start_order(_step: &mut WaterfallStepContext<'_>) -> Result<StepDirective, DialogError> {
    Ok(StepDirective::begin(SLOT_DIALOG_ID))
}

fn confirm_order(step: &mut WaterfallStepContext<'_>) -> Result<StepDirective, DialogError> {
    let order: Order = step.result_as()?;
    tracing::info!(
        conversation_id = %step.turn.conversation_id(),
        color = %order.color.value,
        city = %order.city,
        warehouse = %order.warehouse,
        "Order accepted"
    );
    step.turn.send_text(order.confirmation());
    Ok(StepDirective::EndDialog(step.result.clone()))
}

/// Every dialog the order bot uses: the three prompts, the order
/// slot-filling dialog, and the two-step root waterfall.
pub fn order_dialogs() -> Result<DialogSet, DialogError> {
    let mut dialogs = DialogSet::with_default_prompts();
    dialogs.add(SlotFillingDialog::new(SLOT_DIALOG_ID, order_slots())?)?;
    dialogs.add(
        WaterfallDialog::new(ROOT_DIALOG_ID)
            .step("start_order", start_order)
            .step("confirm_order", confirm_order),
    )?;
    Ok(dialogs)
}
