//! Comment templates posted to workflow tasks.

use chrono::NaiveDate;

use crate::registry::types::{EmployeeContract, REGISTRY_DATE_FORMAT};

const UNKNOWN_START: &str = "неизвестной даты";
const UNKNOWN_END: &str = "неизвестную дату";

fn start_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(REGISTRY_DATE_FORMAT).to_string())
        .unwrap_or_else(|| UNKNOWN_START.to_string())
}

fn end_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(REGISTRY_DATE_FORMAT).to_string())
        .unwrap_or_else(|| UNKNOWN_END.to_string())
}

pub fn no_employment(full_name: &str, today: NaiveDate) -> String {
    format!(
        "{full_name} в трудовых отношениях с РАНХиГС (без филиалов) по состоянию на {} не состоит.\
         <br><br><b>Примечание</b><br>\
         Нет технической возможности проверить информацию о трудоустройстве в филиалах.",
        today.format(REGISTRY_DATE_FORMAT)
    )
}

pub fn permanent(full_name: &str, contract: &EmployeeContract) -> String {
    format!(
        "{full_name} имеет бессрочные трудовые отношения с Академией с {} \
         в подразделении «{}» на должности «{}».",
        start_date(contract.date_start),
        contract.department,
        contract.position
    )
}

pub fn temporary(full_name: &str, contract: &EmployeeContract) -> String {
    format!(
        "{full_name} имеет срочные трудовые отношения с Академией с {} по {} \
         в подразделении «{}» на должности «{}».",
        start_date(contract.date_start),
        end_date(contract.date_end),
        contract.department,
        contract.position
    )
}

pub fn civil_law(full_name: &str, contract: &EmployeeContract) -> String {
    format!(
        "{full_name} имеет договор ГПХ с Академией с {} по {}.",
        start_date(contract.date_start),
        end_date(contract.date_end)
    )
}

pub fn escalation(category: &str, support_url: &str) -> String {
    format!(
        "<b>Ошибка: {category}</b><br>\
         В процессе обработки задачи произошла ошибка. \
         Обратитесь в <a href=\"{support_url}\">Техническую поддержку РАНХиГС</a>."
    )
}
