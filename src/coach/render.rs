//! Message rendering — every user-facing text the coach sends.

use crate::delivery::{OutboundMessage, ReplyControls};
use crate::error::ValidationError;
use crate::onboarding::prompts::{section_intro, validation_hint};
use crate::onboarding::validator::SKIP_MARKER;
use crate::onboarding::{Prompt, QuestionDefinition, QuestionKind};
use crate::plan::{ActivePlan, Goal, PlanPeriod, PlanTargets};

/// Callback payload of the "build plan" button.
pub const BUILD_PLAN: &str = "plan:build";

pub const MENU_PLAN: &str = "📅 План";
pub const MENU_REPORT: &str = "📝 Отчёт";
pub const MENU_HOME: &str = "🏠 Главное меню";

/// Persistent main-menu keyboard.
pub fn main_menu() -> ReplyControls {
    ReplyControls::Menu(vec![
        vec![MENU_PLAN.to_string(), MENU_REPORT.to_string()],
        vec![MENU_HOME.to_string()],
    ])
}

pub fn welcome(name: Option<&str>) -> OutboundMessage {
    let greeting = match name {
        Some(name) => format!("Привет, {}!", escape_html(name)),
        None => "Привет!".to_string(),
    };
    OutboundMessage::html(format!(
        "{greeting} Я твой фитнес-коуч.\n\n\
         Начнём с анкеты: /onboarding или просто напиши «анкета».\n\
         Готовый план — кнопка «{MENU_PLAN}», отчёт о тренировке — «{MENU_REPORT}»."
    ))
    .with_controls(main_menu())
}

pub fn home(has_plan: bool) -> OutboundMessage {
    let hint = if has_plan {
        "Главное меню. Посмотри план или отправь отчёт о тренировке."
    } else {
        "Главное меню. Плана пока нет, начни с анкеты: /onboarding"
    };
    OutboundMessage::text(hint).with_controls(main_menu())
}

/// The messages that present a question: the block intro when the question
/// opens a new block, then the question itself.
pub fn question(prompt: &Prompt) -> Vec<OutboundMessage> {
    let mut out = Vec::with_capacity(2);
    if prompt.opens_section {
        out.push(OutboundMessage::html(section_intro(prompt.question.section)));
    }
    out.push(ask(&prompt.question));
    out
}

/// Corrective hint followed by the same question again.
pub fn rejected(error: &ValidationError, question: &QuestionDefinition) -> Vec<OutboundMessage> {
    vec![
        OutboundMessage::text(validation_hint(error, question)),
        ask(question),
    ]
}

fn ask(question: &QuestionDefinition) -> OutboundMessage {
    let controls = match &question.kind {
        QuestionKind::SingleChoice { options, .. } => ReplyControls::Choices {
            key: question.key.clone(),
            options: options.clone(),
        },
        _ => ReplyControls::RemoveKeyboard,
    };
    let mut text = question.prompt.clone();
    if question.optional {
        text.push_str(&format!("\n(можно пропустить, отправь «{SKIP_MARKER}»)"));
    }
    OutboundMessage::text(text).with_controls(controls)
}

pub fn onboarding_already_running() -> OutboundMessage {
    OutboundMessage::text("Анкета уже идёт, продолжаем с текущего вопроса.")
}

pub fn onboarding_done() -> OutboundMessage {
    OutboundMessage::text("Анкета заполнена, спасибо! Соберу план на месяц по твоим ответам.")
        .with_controls(ReplyControls::Actions(vec![(
            "Сформировать план ▶️".to_string(),
            BUILD_PLAN.to_string(),
        )]))
}

pub fn cancelled(existed: bool) -> OutboundMessage {
    let text = if existed {
        "Анкета отменена. Начать заново: /onboarding"
    } else {
        "Сейчас нечего отменять."
    };
    OutboundMessage::text(text).with_controls(main_menu())
}

/// Reply to a press on a question that is no longer current.
pub fn stale_selection() -> OutboundMessage {
    OutboundMessage::text("Этот вопрос уже пройден, отвечай на последний.")
}

pub fn needs_onboarding() -> OutboundMessage {
    OutboundMessage::text("Сначала пройди анкету: /onboarding").with_controls(main_menu())
}

pub fn building_plan() -> OutboundMessage {
    OutboundMessage::text("Собираю план, это займёт до минуты…")
}

/// The stored plan's period is over; offer a fresh one from the same answers.
pub fn plan_expired() -> OutboundMessage {
    OutboundMessage::text("Период этого плана закончился. Собрать новый по тем же ответам?")
        .with_controls(ReplyControls::Actions(vec![(
            "Обновить план 🔄".to_string(),
            BUILD_PLAN.to_string(),
        )]))
}

pub fn plan(plan: &ActivePlan) -> OutboundMessage {
    let body = match plan {
        ActivePlan::ModelEnriched {
            plan: model,
            baseline,
            period,
        } => match model.rich_html() {
            Some(html) => format!("{}\n\n{}", html_breaks(html), period_line(period)),
            None => targets_summary(baseline, period),
        },
        ActivePlan::Calculated { targets, period } => targets_summary(targets, period),
    };
    OutboundMessage::html(body).with_controls(main_menu())
}

fn targets_summary(t: &PlanTargets, period: &PlanPeriod) -> String {
    format!(
        "<b>Твой план</b>\n\
         Цель: {goal}\n\n\
         <b>Питание</b>\n\
         Базовый обмен: {resting} ккал\n\
         Расход с активностью: {total} ккал (×{mult})\n\
         Цель по калориям: <b>{target} ккал</b>\n\
         Белок: {protein} г на кг веса\n\
         Вода: {water} мл\n\
         Сон: {sleep} ч\n\n\
         <b>Тренировки</b> ({days} в неделю)\n\
         {template}\n\n\
         {period}",
        goal = goal_label(t.goal),
        resting = t.resting_kcal,
        total = t.total_kcal,
        mult = t.activity_multiplier,
        target = t.target_kcal,
        protein = t.protein_g_per_kg,
        water = t.water_ml,
        sleep = t.sleep_hours,
        days = t.days_per_week,
        template = t.workout_template.join(" / "),
        period = period_line(period),
    )
}

fn period_line(period: &PlanPeriod) -> String {
    format!(
        "Период: {} — {}",
        period.start.format("%d.%m.%Y"),
        period.end.format("%d.%m.%Y")
    )
}

fn goal_label(goal: Goal) -> &'static str {
    match goal {
        Goal::Loss => "похудение",
        Goal::Gain => "набор мышечной массы",
        Goal::Maintenance => "здоровье и поддержание",
        Goal::Performance => "результативность",
    }
}

pub fn report_prompt(remaining: u32, limit: u32) -> OutboundMessage {
    OutboundMessage::text(format!(
        "Опиши тренировку одним сообщением: упражнения, веса, повторы, самочувствие.\n\
         Осталось отчётов сегодня: {remaining}/{limit}"
    ))
    .with_controls(ReplyControls::RemoveKeyboard)
}

pub fn report_saved(remaining: u32, limit: u32) -> OutboundMessage {
    OutboundMessage::text(format!(
        "Отчёт сохранён 💪 Осталось отчётов сегодня: {remaining}/{limit}"
    ))
    .with_controls(main_menu())
}

pub fn report_limit_reached(limit: u32) -> OutboundMessage {
    OutboundMessage::text(format!(
        "На сегодня лимит отчётов исчерпан ({limit}/{limit}). Завтра счётчик обнулится."
    ))
    .with_controls(main_menu())
}

pub fn not_understood() -> OutboundMessage {
    OutboundMessage::text("Не понял. Выбери действие в меню или начни анкету: /onboarding")
        .with_controls(main_menu())
}

pub fn internal_error() -> OutboundMessage {
    OutboundMessage::text("Что-то пошло не так, попробуй ещё раз чуть позже.")
}

/// Telegram HTML has no `<br>`; turn every spelling of it into a newline.
fn html_breaks(html: &str) -> String {
    html.replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("<br>", "\n")
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
