//! The finalized output of one completed session.

use serde::{Deserialize, Serialize};

use super::errors::FormError;
use super::fields::{FieldKey, FormFields};
use super::flow::FormFlow;
use super::prompts::{escape_html, MEDIA_NOT_PROVIDED, NOT_PROVIDED};
use super::session::Session;
use crate::domain::foundation::{FormSessionId, Timestamp, UserId};

/// Number of columns in a record row.
pub const ROW_WIDTH: usize = 13;

/// Immutable snapshot handed to the record store and the operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRecord {
    session_id: FormSessionId,
    user_id: UserId,
    submitted_at: Timestamp,
    fields: FormFields,
    media: Option<String>,
}

impl FormRecord {
    /// Snapshots `session`, checking field presence against the branch taken.
    pub fn from_session(
        flow: &FormFlow,
        session: &Session,
        submitted_at: Timestamp,
    ) -> Result<Self, FormError> {
        let missing = flow.missing_fields(session.fields());
        if !missing.is_empty() {
            return Err(FormError::IncompleteRecord { missing });
        }

        Ok(Self {
            session_id: session.id(),
            user_id: session.user_id().clone(),
            submitted_at,
            fields: session.fields().clone(),
            media: media_column(session),
        })
    }

    pub fn session_id(&self) -> FormSessionId {
        self.session_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn submitted_at(&self) -> &Timestamp {
        &self.submitted_at
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    /// Media reference, `None` when nothing was uploaded.
    pub fn media(&self) -> Option<&str> {
        self.media.as_deref()
    }

    /// Spreadsheet row with a fixed column order regardless of branch.
    ///
    /// Absent fields get the placeholder; fields a branch emptied stay `""`.
    pub fn to_row(&self) -> Vec<String> {
        let cell = |key| {
            self.fields
                .rendered(key)
                .unwrap_or_else(|| NOT_PROVIDED.to_string())
        };
        vec![
            self.fields
                .non_blank(FieldKey::ManagerName)
                .unwrap_or_else(|| NOT_PROVIDED.to_string()),
            self.submitted_at.to_record_string(),
            cell(FieldKey::ContactName),
            cell(FieldKey::Phone),
            cell(FieldKey::Address),
            cell(FieldKey::HasCadastr),
            cell(FieldKey::HasTransformer),
            cell(FieldKey::TransformerPower),
            cell(FieldKey::FreePower),
            cell(FieldKey::Station),
            self.media
                .clone()
                .unwrap_or_else(|| MEDIA_NOT_PROVIDED.to_string()),
            cell(FieldKey::LocationLink),
            cell(FieldKey::LocationInfo),
        ]
    }

    /// HTML message for operators.
    pub fn operator_summary(&self) -> String {
        let value = |key| {
            self.fields
                .non_blank(key)
                .map(|v| escape_html(&v))
                .unwrap_or_else(|| NOT_PROVIDED.to_string())
        };
        let power = |key| {
            self.fields
                .non_blank(key)
                .map(|v| format!("{} кВт", escape_html(&v)))
                .unwrap_or_else(|| NOT_PROVIDED.to_string())
        };
        let location = self
            .fields
            .non_blank(FieldKey::LocationLink)
            .map(|link| format!("<a href=\"{}\">Открыть карту</a>", escape_html(&link)))
            .unwrap_or_else(|| NOT_PROVIDED.to_string());
        let media = self
            .media
            .as_deref()
            .map(escape_html)
            .unwrap_or_else(|| MEDIA_NOT_PROVIDED.to_string());

        format!(
            "<b>Новый запрос на подключение</b>\n\n\
             <b>Менеджер:</b> {}\n\
             <b>Время:</b> {}\n\
             <b>Контактное лицо:</b> {}\n\
             <b>Телефон:</b> {}\n\
             <b>Адрес:</b> {}\n\
             <b>Кадастр:</b> {}\n\
             <b>Трансформатор:</b> {}\n\
             <b>Мощность ТП:</b> {}\n\
             <b>Свободная мощность ТП:</b> {}\n\
             <b>Станция:</b> {}\n\
             <b>Местоположение:</b> {}\n\
             <b>Информация о местоположении:</b> {}\n\
             <b>Фото/видео:</b> {}",
            value(FieldKey::ManagerName),
            self.submitted_at.to_record_string(),
            value(FieldKey::ContactName),
            value(FieldKey::Phone),
            value(FieldKey::Address),
            value(FieldKey::HasCadastr),
            value(FieldKey::HasTransformer),
            power(FieldKey::TransformerPower),
            power(FieldKey::FreePower),
            value(FieldKey::Station),
            location,
            value(FieldKey::LocationInfo),
            media,
        )
    }
}

/// Folder link if a dedicated folder exists, else the file links.
fn media_column(session: &Session) -> Option<String> {
    if session.attachments().is_empty() {
        return None;
    }
    match session.folder() {
        Some(folder) => Some(folder.link.clone()),
        None => Some(
            session
                .attachments()
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::form::fields::{FieldValue, GeoPoint};
    use crate::domain::form::flow::FlowCapabilities;
    use crate::domain::form::prompts::{NO_VALUE, YES_VALUE};
    use crate::domain::form::session::{AttachmentFolder, AttachmentRef};
    use crate::domain::form::stage::Stage;
    use chrono::{FixedOffset, TimeZone};

    fn at() -> Timestamp {
        let offset = FixedOffset::east_opt(5 * 3600).unwrap();
        Timestamp::from_datetime(offset.with_ymd_and_hms(2025, 4, 21, 14, 30, 0).unwrap())
    }

    fn session_without_transformer() -> Session {
        let mut session = Session::start(
            UserId::new("42").unwrap(),
            Stage::ContactName,
            Some("Bobur".into()),
            at(),
        );
        session.record(FieldKey::ContactName, FieldValue::Text("Ali".into()));
        session.record(FieldKey::Phone, FieldValue::Text("901234567".into()));
        session.record(FieldKey::Address, FieldValue::Text("Samarkand".into()));
        session.record(FieldKey::HasCadastr, FieldValue::Choice(NO_VALUE.into()));
        session.record(FieldKey::HasTransformer, FieldValue::Choice(NO_VALUE.into()));
        for key in [FieldKey::TransformerPower, FieldKey::FreePower, FieldKey::Station] {
            session.record(key, FieldValue::Empty);
        }
        session.record(
            FieldKey::LocationLink,
            FieldValue::Location(GeoPoint::new(39.65, 66.96)),
        );
        session.record(FieldKey::LocationInfo, FieldValue::Text("<near> school".into()));
        session
    }

    mod rows {
        use super::*;

        #[test]
        fn row_has_stable_width_and_order() {
            let record =
                FormRecord::from_session(&FormFlow::default(), &session_without_transformer(), at())
                    .unwrap();
            let row = record.to_row();
            assert_eq!(row.len(), ROW_WIDTH);
            assert_eq!(row[0], "Bobur");
            assert_eq!(row[1], "2025-04-21 14:30:00");
            assert_eq!(row[2], "Ali");
            assert_eq!(row[3], "901234567");
            assert_eq!(row[4], "Samarkand");
            assert_eq!(row[5], NO_VALUE);
            assert_eq!(row[6], NO_VALUE);
            assert_eq!(&row[7..10], &["", "", ""]);
            assert_eq!(row[10], MEDIA_NOT_PROVIDED);
            assert_eq!(row[11], "https://maps.google.com/?q=39.65,66.96");
            assert_eq!(row[12], "<near> school");
        }

        #[test]
        fn disabled_stages_render_placeholder() {
            let full = session_without_transformer();
            let mut session =
                Session::start(full.user_id().clone(), Stage::ContactName, None, at());
            for key in full.fields().keys() {
                if key != FieldKey::ManagerName && key != FieldKey::LocationInfo {
                    session.record(key, full.fields().get(key).cloned().unwrap());
                }
            }
            let flow = FormFlow::new(FlowCapabilities::minimal());
            let row = FormRecord::from_session(&flow, &session, at()).unwrap().to_row();
            assert_eq!(row.len(), ROW_WIDTH);
            assert_eq!(row[0], NOT_PROVIDED);
            assert_eq!(row[12], NOT_PROVIDED);
        }

        #[test]
        fn folder_link_wins_over_file_links() {
            let mut session = session_without_transformer();
            session.add_attachment(AttachmentRef::new("https://file/1"));
            session.set_folder(AttachmentFolder {
                id: "f1".into(),
                link: "https://folder/f1".into(),
            });
            let record = FormRecord::from_session(&FormFlow::default(), &session, at()).unwrap();
            assert_eq!(record.media(), Some("https://folder/f1"));
        }

        #[test]
        fn file_links_are_joined_without_folder() {
            let mut session = session_without_transformer();
            session.add_attachment(AttachmentRef::new("https://file/1"));
            session.add_attachment(AttachmentRef::new("https://file/2"));
            let record = FormRecord::from_session(&FormFlow::default(), &session, at()).unwrap();
            assert_eq!(record.to_row()[10], "https://file/1\nhttps://file/2");
        }
    }

    mod presence {
        use super::*;

        #[test]
        fn yes_branch_without_power_is_incomplete() {
            let mut session = session_without_transformer();
            session.record(FieldKey::HasTransformer, FieldValue::Choice(YES_VALUE.into()));
            let err = FormRecord::from_session(&FormFlow::default(), &session, at()).unwrap_err();
            match err {
                FormError::IncompleteRecord { missing } => assert_eq!(
                    missing,
                    vec![FieldKey::TransformerPower, FieldKey::FreePower, FieldKey::Station]
                ),
                other => panic!("unexpected error {:?}", other),
            }
        }

        #[test]
        fn missing_phone_is_incomplete() {
            let mut session = Session::start(
                UserId::new("42").unwrap(),
                Stage::ContactName,
                Some("Bobur".into()),
                at(),
            );
            session.record(FieldKey::ContactName, FieldValue::Text("Ali".into()));
            let result = FormRecord::from_session(&FormFlow::default(), &session, at());
            assert!(matches!(result, Err(FormError::IncompleteRecord { .. })));
        }
    }

    mod summary {
        use super::*;

        #[test]
        fn summary_uses_placeholder_for_empty_values() {
            let record =
                FormRecord::from_session(&FormFlow::default(), &session_without_transformer(), at())
                    .unwrap();
            let text = record.operator_summary();
            assert!(text.contains("<b>Мощность ТП:</b> Не указано"));
            assert!(text.contains("<b>Станция:</b> Не указано"));
            assert!(text.contains("<b>Фото/видео:</b> Не загружено"));
        }

        #[test]
        fn summary_escapes_user_text() {
            let record =
                FormRecord::from_session(&FormFlow::default(), &session_without_transformer(), at())
                    .unwrap();
            assert!(record.operator_summary().contains("&lt;near&gt; school"));
        }

        #[test]
        fn summary_suffixes_power_values() {
            let mut session = session_without_transformer();
            session.record(FieldKey::HasTransformer, FieldValue::Choice(YES_VALUE.into()));
            session.record(FieldKey::TransformerPower, FieldValue::Quantity("630".into()));
            session.record(FieldKey::FreePower, FieldValue::Quantity("200".into()));
            session.record(FieldKey::Station, FieldValue::Choice("60кВт".into()));
            let record = FormRecord::from_session(&FormFlow::default(), &session, at()).unwrap();
            let text = record.operator_summary();
            assert!(text.contains("<b>Мощность ТП:</b> 630 кВт"));
            assert!(text.contains("<b>Свободная мощность ТП:</b> 200 кВт"));
            assert!(text.contains("<b>Станция:</b> 60кВт"));
        }
    }
}
