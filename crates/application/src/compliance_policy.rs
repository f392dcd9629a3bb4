use chainaudit_domain::{ComplianceFlags, Event};

/// Decides which regulatory regimes apply to an event.
pub trait CompliancePolicy: Send + Sync {
    /// Returns the compliance flags for `event`.
    fn flags_for(&self, event: &Event) -> ComplianceFlags;
}

/// Flags derived from the event type alone.
///
/// `payment` events clear the PCI flag and `medical` events clear the HIPAA
/// flag. GDPR and SOX are always set; deployments with real regulatory
/// rules provide their own [`CompliancePolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EventTypeCompliancePolicy;

impl CompliancePolicy for EventTypeCompliancePolicy {
    fn flags_for(&self, event: &Event) -> ComplianceFlags {
        ComplianceFlags {
            gdpr: true,
            sox: true,
            pci: event.event_type() != "payment",
            hipaa: event.event_type() != "medical",
        }
    }
}

#[cfg(test)]
mod tests {
    use chainaudit_domain::{Event, EventInput};

    use super::{CompliancePolicy, EventTypeCompliancePolicy};

    fn event_of_type(event_type: &str) -> Event {
        Event::from_input(EventInput {
            event_id: Some("evt-compliance".to_owned()),
            event_type: Some(event_type.to_owned()),
            ..EventInput::default()
        })
        .unwrap_or_else(|error| panic!("valid event rejected: {error}"))
    }

    #[test]
    fn payment_clears_pci_only() {
        let flags = EventTypeCompliancePolicy.flags_for(&event_of_type("payment"));
        assert!(!flags.pci);
        assert!(flags.hipaa);
        assert!(flags.gdpr && flags.sox);
    }

    #[test]
    fn medical_clears_hipaa_only() {
        let flags = EventTypeCompliancePolicy.flags_for(&event_of_type("medical"));
        assert!(flags.pci);
        assert!(!flags.hipaa);
    }

    #[test]
    fn other_types_keep_every_flag() {
        let flags = EventTypeCompliancePolicy.flags_for(&event_of_type("login"));
        assert!(flags.pci && flags.hipaa && flags.gdpr && flags.sox);
    }
}
