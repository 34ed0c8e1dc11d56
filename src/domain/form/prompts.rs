//! Static prompt strings, button ids and reply builders.

use super::messages::{Button, Reply, ReplyMarkup};

pub const BTN_START_REQUEST: &str = "start_request";
pub const BTN_RESTART: &str = "restart_request";
pub const BTN_FINISH: &str = "finish_upload";
pub const BTN_CADASTR_YES: &str = "cadastr_yes";
pub const BTN_CADASTR_NO: &str = "cadastr_no";
pub const BTN_TRANSFORMER_YES: &str = "transformer_yes";
pub const BTN_TRANSFORMER_NO: &str = "transformer_no";

pub const YES_VALUE: &str = "Есть";
pub const NO_VALUE: &str = "Нет";

/// Row/summary text for a field nobody filled in.
pub const NOT_PROVIDED: &str = "Не указано";
/// Row text for the media column when nothing was uploaded.
pub const MEDIA_NOT_PROVIDED: &str = "Не загружено";

pub const MANAGER_NAME: &str = "<b>Пожалуйста, введите имя менеджера:</b>";
pub const MANAGER_NAME_RETRY: &str = "<b>Имя менеджера не может быть пустым.</b> Введите имя менеджера:";
pub const CONTACT_NAME: &str = "<b>Введите контактное лицо:</b>";
pub const CONTACT_NAME_RETRY: &str = "<b>Контактное лицо не может быть пустым.</b> Введите контактное лицо:";
pub const PHONE: &str =
    "<b>Введите контактный телефон:</b> (например, +998901234567 или 901234567)";
pub const PHONE_RETRY: &str = "<b>Пожалуйста, введите телефон в правильном формате:</b> (например, +998901234567 или 901234567)";
pub const ADDRESS: &str = "<b>Введите адрес:</b> (например, Самарканд)";
pub const ADDRESS_RETRY: &str = "<b>Адрес не может быть пустым.</b> Введите адрес:";
pub const CADASTR: &str = "<b>У вас есть кадастровый номер?</b>";
pub const TRANSFORMER: &str = "<b>У вас есть трансформатор?</b>";
pub const CHOICE_RETRY: &str = "<b>Пожалуйста, выберите вариант с помощью кнопок ниже.</b>";
pub const TRANSFORMER_POWER: &str = "<b>Введите мощность ТП (кВт):</b>";
pub const TRANSFORMER_POWER_RETRY: &str =
    "<b>Пожалуйста, введите мощность ТП в виде числа (кВт):</b>";
pub const FREE_POWER: &str = "<b>Введите свободную мощность ТП (кВт):</b>";
pub const FREE_POWER_RETRY: &str =
    "<b>Пожалуйста, введите свободную мощность ТП в виде числа (кВт):</b>";
pub const STATION: &str = "<b>Выберите станцию:</b>";
pub const LOCATION: &str = "<b>Отправьте местоположение:</b>";
pub const LOCATION_RETRY: &str = "<b>Пожалуйста, отправьте местоположение через кнопку:</b>";
pub const LOCATION_BUTTON: &str = "📍 Отправить местоположение";
pub const LOCATION_INFO: &str = "<b>Введите дополнительную информацию о местоположении:</b> (например, ориентиры, описание места)";
pub const LOCATION_INFO_RETRY: &str =
    "<b>Пожалуйста, опишите местоположение текстом:</b> (например, ориентиры, описание места)";
pub const MEDIA: &str = "<b>Отправьте фото или видео места:</b>";
pub const MEDIA_RETRY: &str = "<b>Пожалуйста, отправьте только фото или видео:</b>\nИли завершите процесс:";
pub const TEXT_EXPECTED: &str = "<b>Пожалуйста, ответьте текстом.</b>";

pub const UPLOAD_FAILED: &str =
    "<b>Ошибка при загрузке файла.</b> ❌\nПопробуйте снова или завершите:";
pub const UPLOAD_LIMIT: &str =
    "<b>Файл уже загружен.</b>\nНажмите «Завершить», чтобы отправить запрос:";
pub const SAVED: &str =
    "<b>Данные успешно сохранены!</b> ✅\nНажмите на кнопку ниже, чтобы начать заново:";
pub const SAVE_FAILED: &str = "⚠ <b>Произошла ошибка при сохранении данных.</b> Попробуйте снова.";
pub const INCOMPLETE: &str =
    "⚠ <b>Не все данные заполнены.</b> Пожалуйста, начните запрос заново.";
pub const CANCELLED: &str =
    "<b>Процесс отменён.</b> ✅\nНажмите на кнопку ниже, чтобы начать заново:";
pub const CHANGE_MANAGER: &str = "<b>Введите новое имя менеджера:</b>";
pub const CHANGE_MANAGER_FAILED: &str =
    "⚠ <b>Не удалось сохранить имя менеджера.</b> Попробуйте ещё раз:";
pub const IDLE: &str = "Нажмите на кнопку ниже, чтобы начать запрос:";
pub const CANCEL_HINT: &str =
    "<i>В любой момент вы можете отменить процесс, введя команду /cancel.</i>";

const START_REQUEST_LABEL: &str = "📝 Начать запрос";
const RESTART_LABEL: &str = "🔄 Начать заново";
const FINISH_LABEL: &str = "✅ Завершить";

/// Escapes the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn start_request_button() -> Button {
    Button::new(BTN_START_REQUEST, START_REQUEST_LABEL)
}

pub fn restart_button() -> Button {
    Button::new(BTN_RESTART, RESTART_LABEL)
}

pub fn finish_button() -> Button {
    Button::new(BTN_FINISH, FINISH_LABEL)
}

pub fn location_keyboard() -> ReplyMarkup {
    ReplyMarkup::RequestLocation {
        label: LOCATION_BUTTON.to_string(),
    }
}

/// First message of a `/start`.
///
/// With a remembered manager the user is asked for the contact name straight
/// away; otherwise for the manager name.
pub fn greeting(display_name: Option<&str>, manager: Option<&str>, first_prompt: &str) -> Reply {
    let hello = match display_name {
        Some(name) => format!("<b>Здравствуйте, {}!</b> 🎉", escape_html(name)),
        None => "<b>Здравствуйте!</b> 🎉".to_string(),
    };
    let text = match manager {
        Some(manager) => format!(
            "{}\nТекущий менеджер: {}\n{}",
            hello,
            escape_html(manager),
            first_prompt
        ),
        None => format!("{}\n\n{}\n\n{}", hello, first_prompt, CANCEL_HINT),
    };
    Reply::html(text)
}

/// Prompt after a restart or a "start request" press.
pub fn resume_prompt(manager: Option<&str>, first_prompt: &str) -> Reply {
    match manager {
        Some(manager) => Reply::html(format!(
            "<b>Текущий менеджер:</b> {}\n{}",
            escape_html(manager),
            first_prompt
        )),
        None => Reply::html(first_prompt),
    }
}

pub fn upload_succeeded(kind_label: &str, allow_more: bool) -> Reply {
    let follow_up = if allow_more {
        "Отправьте ещё фото/видео или завершите:"
    } else {
        "Нажмите «Завершить», чтобы отправить запрос:"
    };
    Reply::html(format!(
        "<b>{} успешно загружено!</b> ✅\n{}",
        kind_label, follow_up
    ))
    .with_buttons(vec![finish_button()])
}

pub fn manager_changed(name: &str) -> Reply {
    Reply::html(format!(
        "<b>Имя менеджера успешно изменено на:</b> {}\nНажмите на кнопку ниже, чтобы начать запрос:",
        escape_html(name)
    ))
    .with_buttons(vec![start_request_button()])
}
