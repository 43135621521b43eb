// server/src/lang.rs
//
// Player-facing text in English and Russian. Unknown locales and missing
// entries fall back to English.

pub const DEFAULT_LOCALE: &str = "en";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKey {
    NoPermission,
    ButtonText,
    Category,
    Disabled,
    Enabled,
    Name,
    Prefix,
    ButtonStatus,
    SortType,
    Help,
}

fn english(key: MessageKey) -> &'static str {
    match key {
        MessageKey::NoPermission => "You do not have permission to use this command",
        MessageKey::ButtonText => "Sort",
        MessageKey::Category => "Category",
        MessageKey::Disabled => "Disabled",
        MessageKey::Enabled => "Enabled",
        MessageKey::Name => "Name",
        MessageKey::Prefix => "[Sort Button]: ",
        MessageKey::ButtonStatus => "Sort Button is now {0}",
        MessageKey::SortType => "Sort Type is now {0}",
        MessageKey::Help => "List Commands:\n\
            /{0} - Enable/Disable Sort Button.\n\
            /{0} <sort | type> - change sort type.",
    }
}

fn russian(key: MessageKey) -> Option<&'static str> {
    let text = match key {
        MessageKey::NoPermission => "У вас нет разрешения на использование этой команды",
        MessageKey::ButtonText => "Сортировать",
        MessageKey::Category => "Категория",
        MessageKey::Disabled => "Отключена",
        MessageKey::Enabled => "Включена",
        MessageKey::Name => "Имя",
        MessageKey::ButtonStatus => "Кнопка сортировки теперь {0}",
        MessageKey::SortType => "Тип сортировки теперь {0}",
        MessageKey::Help => "Список команд:\n\
            /{0} - Включить/Отключить кнопку сортировки.\n\
            /{0} <sort | type> - изменить тип сортировки.",
        MessageKey::Prefix => return None,
    };
    Some(text)
}

/// Accepts "ru", "ru-RU", "RU_ru" and so on.
fn language(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(DEFAULT_LOCALE)
}

pub fn message(locale: &str, key: MessageKey) -> &'static str {
    let translated = match language(locale).to_ascii_lowercase().as_str() {
        "ru" => russian(key),
        _ => None,
    };
    translated.unwrap_or_else(|| english(key))
}

/// `message` with `{0}` replaced by `arg`.
pub fn format_message(locale: &str, key: MessageKey, arg: &str) -> String {
    message(locale, key).replace("{0}", arg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_is_the_default() {
        assert_eq!(message("en", MessageKey::ButtonText), "Sort");
        assert_eq!(message("de", MessageKey::ButtonText), "Sort");
        assert_eq!(message("", MessageKey::Enabled), "Enabled");
    }

    #[test]
    fn russian_with_region_suffix() {
        assert_eq!(message("ru", MessageKey::ButtonText), "Сортировать");
        assert_eq!(message("RU-ru", MessageKey::Name), "Имя");
    }

    #[test]
    fn missing_translation_falls_back() {
        assert_eq!(message("ru", MessageKey::Prefix), "[Sort Button]: ");
    }

    #[test]
    fn placeholders_are_replaced() {
        assert_eq!(format_message("en", MessageKey::ButtonStatus, "Enabled"), "Sort Button is now Enabled");
        let help = format_message("en", MessageKey::Help, "sortbutton");
        assert!(help.contains("/sortbutton - Enable/Disable"));
        assert!(help.contains("/sortbutton <sort | type>"));
        assert!(!help.contains("{0}"));
    }
}
