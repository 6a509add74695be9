//! Selectors tied to the portal's current markup.
//!
//! Everything the driver and the parsers look for on the remote pages is
//! declared here. A change in the portal's HTML should only ever require
//! edits in this file.

/// Anchor that switches the landing page to the student login form.
pub const STUDENT_LINK: &str = "#studentLink";
pub const STUDENT_FORM: &str = "#studentForm";
pub const REG_NO_INPUT: &str = "#studentForm #inputStuId";
pub const PASSWORD_INPUT: &str = "#studentForm #inputPassword";
pub const SUBMIT_BUTTON: &str = "#studentForm #studentSubmitButton";

/// Fixed bottom navbar that can sit on top of the submit button.
pub const FIXED_OVERLAY: &str = ".navbar-fixed-bottom";

/// Shown by the login form when the portal rejects the credentials.
pub const ERROR_INDICATOR: &str = "#studentErrorDiv";

/// Ext JS display field. Its first appearance marks a rendered profile page.
pub const DISPLAY_FIELD: &str = ".x-form-display-field";
pub const ROLL_NUMBER_FIELD: &str = "#profileUsn .x-form-display-field";
pub const PROFILE_IMAGE: &str = ".x-component.profDetails img";

/// Substring of the image URL the portal serves when no photo is on file.
pub const PLACEHOLDER_IMAGE_PATTERN: &str = "loadImage.action";

/// One fieldset per subject on the attendance panel.
pub const ATTENDANCE_FRAGMENT: &str = ".x-fieldset.bottom-border.x-fieldset-default";

pub const DEFAULT_NAME: &str = "Unknown";
pub const DEFAULT_ROLL_NUMBER: &str = "Not Found";
pub const MISSING_IMAGE: &str = "Image not found";

/// The fields read out of an attendance fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    SubjectCode,
    Present,
    Conducted,
}

/// Maps row fields to their structural position inside a fragment.
///
/// The portal renders the row as a sequence of `div.x-field.x-form-item`
/// children without stable labels, so fields are addressed by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSchema {
    pub subject_code: usize,
    pub present: usize,
    pub conducted: usize,
}

impl RowSchema {
    /// Layout currently served by the portal.
    pub const PORTAL: RowSchema = RowSchema {
        subject_code: 2,
        present: 3,
        conducted: 4,
    };

    pub fn position(&self, field: RowField) -> usize {
        match field {
            RowField::SubjectCode => self.subject_code,
            RowField::Present => self.present,
            RowField::Conducted => self.conducted,
        }
    }

    /// Selector for the display field of `field`, relative to a fragment.
    pub fn selector(&self, field: RowField) -> String {
        format!(
            "div.x-field.x-form-item:nth-child({}) .x-form-display-field",
            self.position(field)
        )
    }
}

impl Default for RowSchema {
    fn default() -> Self {
        Self::PORTAL
    }
}
