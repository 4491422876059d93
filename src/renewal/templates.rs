use crate::{
    baserow::MemberRecord,
    config::ReminderConfig,
    utils::{escape_html, title_case},
};

/// Language of a reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    French,
    English,
}

impl Locale {
    /// French when one of the preferred languages is French, otherwise when
    /// the member's country is France. English for everyone else.
    pub fn for_member(member: &MemberRecord, french_language_id: i64) -> Self {
        if member.preferred_languages.contains(&french_language_id) {
            return Locale::French;
        }
        if member.country == "France" {
            return Locale::French;
        }
        Locale::English
    }

    pub fn code(&self) -> &'static str {
        match self {
            Locale::French => "fr",
            Locale::English => "en",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Fixed wording of a reminder, one per locale
struct Wording {
    subject: &'static str,
    greeting: &'static str,
    paragraphs: [&'static str; 2],
    link_intro: &'static str,
    thanks: &'static str,
    closing: &'static str,
    signature: &'static str,
}

const FRENCH: Wording = Wording {
    subject: "Il est temps de renouveler votre adhésion à {org}",
    greeting: "Cher(e) {name},",
    paragraphs: [
        "Nous espérons que vous allez bien.",
        "Votre adhésion à l'association {org} arrive à échéance. Nous vous invitons à la renouveler pour continuer à soutenir nos actions en faveur de la mesure et la réduction de l'impact environnemental du numérique.",
    ],
    link_intro: "Pour renouveler votre adhésion, veuillez cliquer sur le lien suivant : ",
    thanks: "Nous vous remercions pour votre soutien continu.",
    closing: "Cordialement,",
    signature: "L'équipe {org}",
};

const ENGLISH: Wording = Wording {
    subject: "It's time to renew your {org} membership",
    greeting: "Dear {name},",
    paragraphs: [
        "We hope this message finds you well.",
        "Your membership with {org} association is coming to an end. We invite you to renew it to continue supporting our efforts in measuring and reducing the environmental impact of digital technology.",
    ],
    link_intro: "To renew your membership, please click on the following link: ",
    thanks: "Thank you for your continued support.",
    closing: "Best regards,",
    signature: "The {org} Team",
};

/// Renders renewal reminders for a given locale
#[derive(Debug, Clone)]
pub struct ReminderTemplate {
    organization: String,
    renewal_link_fr: String,
    renewal_link_en: String,
}

impl ReminderTemplate {
    pub fn new(organization: &str, renewal_link_fr: &str, renewal_link_en: &str) -> Self {
        Self {
            organization: organization.to_string(),
            renewal_link_fr: renewal_link_fr.to_string(),
            renewal_link_en: renewal_link_en.to_string(),
        }
    }

    pub fn from_config(organization: &str, config: &ReminderConfig) -> Self {
        Self::new(organization, &config.renewal_link_fr, &config.renewal_link_en)
    }

    pub fn renewal_link(&self, locale: Locale) -> &str {
        match locale {
            Locale::French => &self.renewal_link_fr,
            Locale::English => &self.renewal_link_en,
        }
    }

    /// Display name of the recipient: normalized first name then surname
    pub fn recipient_name(member: &MemberRecord) -> String {
        format!("{} {}", title_case(&member.first_name), member.surname)
            .trim()
            .to_string()
    }

    pub fn render(&self, locale: Locale, first_name: &str) -> EmailContent {
        let wording = match locale {
            Locale::French => &FRENCH,
            Locale::English => &ENGLISH,
        };
        let name = title_case(first_name);
        let link = self.renewal_link(locale);
        let fill = |s: &str| s.replace("{org}", &self.organization).replace("{name}", &name);
        let fill_html = |s: &str| escape_html(&fill(s));
        let href = escape_html(link);

        let html = format!(
            "<html><body><p>{}</p><p>{}</p><p>{}</p><p>{}<a href=\"{href}\">{href}</a></p><p>{}</p><p>{}<br>{}</p></body></html>",
            fill_html(wording.greeting),
            fill_html(wording.paragraphs[0]),
            fill_html(wording.paragraphs[1]),
            wording.link_intro,
            wording.thanks,
            wording.closing,
            fill_html(wording.signature),
        );

        let text = format!(
            "{}\n\n{}\n\n{}\n\n{}{link}\n\n{}\n\n{}\n{}",
            fill(wording.greeting),
            fill(wording.paragraphs[0]),
            fill(wording.paragraphs[1]),
            wording.link_intro,
            wording.thanks,
            wording.closing,
            fill(wording.signature),
        );

        EmailContent {
            subject: fill(wording.subject),
            html,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRENCH_ID: i64 = 2591;
    const ENGLISH_ID: i64 = 2590;

    fn template() -> ReminderTemplate {
        ReminderTemplate::new("Boavizta", "https://pay.example/fr", "https://pay.example/en")
    }

    fn member(languages: Vec<i64>, country: &str) -> MemberRecord {
        MemberRecord {
            first_name: "jEAN  luc".to_string(),
            surname: "Picard".to_string(),
            preferred_languages: languages,
            country: country.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_locale_selection() {
        assert_eq!(Locale::for_member(&member(vec![FRENCH_ID], "Canada"), FRENCH_ID), Locale::French);
        assert_eq!(
            Locale::for_member(&member(vec![ENGLISH_ID, FRENCH_ID], ""), FRENCH_ID),
            Locale::French
        );
        assert_eq!(Locale::for_member(&member(vec![], "France"), FRENCH_ID), Locale::French);
        assert_eq!(Locale::for_member(&member(vec![ENGLISH_ID], "Germany"), FRENCH_ID), Locale::English);
        assert_eq!(Locale::for_member(&member(vec![], ""), FRENCH_ID), Locale::English);
    }

    #[test]
    fn test_render_french() {
        let content = template().render(Locale::French, "jEAN  luc");
        assert_eq!(content.subject, "Il est temps de renouveler votre adhésion à Boavizta");
        assert!(content.text.starts_with("Cher(e) Jean Luc,\n\n"));
        assert!(content.text.contains("lien suivant : https://pay.example/fr\n\n"));
        assert!(content.text.ends_with("Cordialement,\nL'équipe Boavizta"));
        assert!(content.html.contains("<a href=\"https://pay.example/fr\">https://pay.example/fr</a>"));
        assert!(content.html.starts_with("<html><body><p>Cher(e) Jean Luc,</p>"));
    }

    #[test]
    fn test_render_english() {
        let content = template().render(Locale::English, "ADA");
        assert_eq!(content.subject, "It's time to renew your Boavizta membership");
        assert!(content.text.starts_with("Dear Ada,"));
        assert!(content.html.contains("https://pay.example/en"));
        assert!(!content.html.contains("https://pay.example/fr"));
        assert!(content.html.ends_with("<p>Best regards,<br>The Boavizta Team</p></body></html>"));
    }

    #[test]
    fn test_render_escapes_html_only() {
        let template = ReminderTemplate::new("R&D <Lab>", "https://pay.example/fr?a=1&b=2", "");
        let content = template.render(Locale::French, "<b>jo</b>");

        assert!(content.html.starts_with("<html><body><p>Cher(e) &lt;b&gt;jo&lt;/b&gt;,</p>"));
        assert!(content.html.contains("L'équipe R&amp;D &lt;Lab&gt;</p>"));
        assert!(content.html.contains("href=\"https://pay.example/fr?a=1&amp;b=2\""));
        assert!(content.text.starts_with("Cher(e) <b>jo</b>,"));
        assert_eq!(content.subject, "Il est temps de renouveler votre adhésion à R&D <Lab>");
    }

    #[test]
    fn test_recipient_name() {
        assert_eq!(
            ReminderTemplate::recipient_name(&member(vec![], "")),
            "Jean Luc Picard"
        );
    }

    #[test]
    fn test_locale_code() {
        assert_eq!(Locale::French.code(), "fr");
        assert_eq!(Locale::English.code(), "en");
    }
}
