use crate::knowledge::IntentLabelSet;
use crate::model::FaqSeed;

/// Intent labels of the clinic support desk.
pub const CLINIC_INTENTS: &[&str] = &[
    "schedule appointment",
    "clinic hours",
    "insurance inquiry",
    "test results",
    "appointment cancellation",
    "prescription refill",
    "covid protocols",
    "update personal info",
    "services offered",
    "telehealth availability",
    "contact support",
];

/// (question, answer, intent) rows of the clinic support desk.
const CLINIC_FAQS: &[(&str, &str, &str)] = &[
    // schedule appointment
    (
        "How do I schedule an appointment?",
        "You can schedule an appointment by calling our clinic or using our online booking system.",
        "schedule appointment",
    ),
    (
        "Can I book an appointment online?",
        "Yes, appointments can be booked online via our website or patient portal.",
        "schedule appointment",
    ),
    (
        "What is the process to make a doctor's appointment?",
        "To make a doctor's appointment, call our front desk or use the online scheduler.",
        "schedule appointment",
    ),
    // clinic hours
    (
        "What are your clinic hours?",
        "Our clinic is open Monday to Friday from 8 AM to 6 PM, and Saturdays from 9 AM to 1 PM.",
        "clinic hours",
    ),
    (
        "Are you open on weekends?",
        "Yes, we are open on Saturdays from 9 AM to 1 PM but closed on Sundays.",
        "clinic hours",
    ),
    (
        "When does the clinic open and close?",
        "We open at 8 AM and close at 6 PM on weekdays.",
        "clinic hours",
    ),
    // insurance inquiry
    (
        "Do you accept my insurance?",
        "We accept most major insurance providers. Please contact us to verify your coverage.",
        "insurance inquiry",
    ),
    (
        "Which insurance plans do you accept?",
        "Our clinic accepts a variety of insurance plans including Aetna, Blue Cross, and United Healthcare.",
        "insurance inquiry",
    ),
    (
        "Can I use my insurance for treatment?",
        "Yes, your insurance can be used for most treatments at our clinic.",
        "insurance inquiry",
    ),
    // test results
    (
        "How can I get my test results?",
        "Test results are usually available within 3-5 business days and can be accessed through your patient portal.",
        "test results",
    ),
    (
        "When will my lab results be ready?",
        "Lab results are typically ready within 3-5 days after testing.",
        "test results",
    ),
    (
        "How do I access my blood test results?",
        "You can view your blood test results online through the patient portal.",
        "test results",
    ),
    // appointment cancellation
    (
        "How do I cancel or reschedule my appointment?",
        "To cancel or reschedule, please call us at least 24 hours before your appointment or use the patient portal.",
        "appointment cancellation",
    ),
    (
        "Can I change my appointment time?",
        "You can change your appointment time by contacting our front desk.",
        "appointment cancellation",
    ),
    (
        "What is the cancellation policy?",
        "Our cancellation policy requires 24-hour notice to avoid fees.",
        "appointment cancellation",
    ),
    // prescription refill
    (
        "How do I refill my prescription?",
        "You can request prescription refills by contacting our pharmacy or through the patient portal.",
        "prescription refill",
    ),
    (
        "Can I get a refill for my medication online?",
        "Refills can be requested online via your patient account.",
        "prescription refill",
    ),
    (
        "What is the process to renew my prescription?",
        "To renew your prescription, contact your doctor or use the online refill service.",
        "prescription refill",
    ),
    // covid protocols
    (
        "What COVID-19 protocols are in place?",
        "We follow all recommended COVID-19 safety protocols, including mask mandates and social distancing.",
        "covid protocols",
    ),
    (
        "Do I need to wear a mask to my appointment?",
        "Masks are required for all visitors during appointments.",
        "covid protocols",
    ),
    (
        "How is your clinic handling COVID-19 safety?",
        "Our clinic enforces strict COVID-19 guidelines to ensure patient safety.",
        "covid protocols",
    ),
    // update personal info
    (
        "How do I update my personal information?",
        "You can update your personal information by logging into your patient account or contacting our front desk.",
        "update personal info",
    ),
    (
        "Can I change my address or phone number online?",
        "Changes to your address or phone number can be made online.",
        "update personal info",
    ),
    (
        "Where do I update my contact details?",
        "Please update your contact details through the patient portal or by calling us.",
        "update personal info",
    ),
    // services offered
    (
        "What services do you offer?",
        "Our services include primary care, pediatrics, lab testing, immunizations, and wellness checkups.",
        "services offered",
    ),
    (
        "Do you provide pediatric care?",
        "Yes, we offer pediatric care as part of our services.",
        "services offered",
    ),
    (
        "What types of medical services are available?",
        "We provide a wide range of medical services including preventive care and diagnostics.",
        "services offered",
    ),
    // telehealth availability
    (
        "Are telehealth visits available?",
        "Telehealth visits are available for many of our services.",
        "telehealth availability",
    ),
    (
        "Can I book a virtual doctor visit?",
        "You can book a virtual doctor visit online through our patient portal.",
        "telehealth availability",
    ),
    (
        "Do you offer video consultations?",
        "Video consultations are offered for appropriate medical concerns.",
        "telehealth availability",
    ),
    // contact support
    (
        "How can I contact customer service?",
        "You can contact customer service via phone at 1-800-123-4567 or email support@clinic.com.",
        "contact support",
    ),
    (
        "What is your support phone number?",
        "Our support phone number is 1-800-123-4567.",
        "contact support",
    ),
    (
        "Who do I talk to for more help?",
        "For more help, please contact our support team by phone or email.",
        "contact support",
    ),
];

pub fn clinic_intents() -> IntentLabelSet {
    // The label list is a compile-time constant with unique, non-blank labels.
    IntentLabelSet::new(CLINIC_INTENTS.iter().copied())
        .unwrap_or_else(|e| unreachable!("built-in intent labels are valid: {e}"))
}

pub fn clinic_faqs() -> Vec<FaqSeed> {
    CLINIC_FAQS
        .iter()
        .map(|(q, a, t)| FaqSeed::new(*q, *a, *t))
        .collect()
}
