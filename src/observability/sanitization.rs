use std::fmt;

/// Controls which sensitive values get redacted in log output.
#[derive(Clone, Debug)]
pub struct SanitizationConfig {
    /// Whether to sanitize payment preimages completely
    pub sanitize_preimages: bool,
    /// Whether to sanitize lightning invoices
    pub sanitize_invoices: bool,
    /// Maximum characters to show from start/end of sensitive data
    pub partial_show_chars: usize,
}

impl Default for SanitizationConfig {
    fn default() -> Self {
        Self {
            sanitize_preimages: true,
            sanitize_invoices: true,
            partial_show_chars: 6,
        }
    }
}

/// A wrapper for sensitive data that implements safe Display
#[derive(Clone, Debug)]
pub struct SensitiveData<T> {
    inner: T,
    data_type: SensitiveDataType,
    config: SanitizationConfig,
}

#[derive(Clone, Debug, Copy)]
pub enum SensitiveDataType {
    /// Lightning invoice (bolt11)
    LightningInvoice,
    /// Payment preimage (hex encoded 32 bytes)
    PaymentPreimage,
    /// Payment hash
    PaymentHash,
    /// Node public key
    NodePubkey,
}

impl SensitiveDataType {
    fn display_name(&self) -> &'static str {
        match self {
            Self::LightningInvoice => "invoice",
            Self::PaymentPreimage => "preimage",
            Self::PaymentHash => "payment_hash",
            Self::NodePubkey => "pubkey",
        }
    }
}

impl<T: fmt::Display> SensitiveData<T> {
    pub fn new(data: T, data_type: SensitiveDataType) -> Self {
        Self {
            inner: data,
            data_type,
            config: SanitizationConfig::default(),
        }
    }

    pub fn with_config(data: T, data_type: SensitiveDataType, config: SanitizationConfig) -> Self {
        Self {
            inner: data,
            data_type,
            config,
        }
    }

    fn sanitized_repr(&self) -> String {
        let original = self.inner.to_string();

        let should_sanitize = match self.data_type {
            SensitiveDataType::LightningInvoice => self.config.sanitize_invoices,
            SensitiveDataType::PaymentPreimage => self.config.sanitize_preimages,
            // Payment hashes are safe to log; pubkeys are public but
            // truncated so log lines stay readable.
            SensitiveDataType::PaymentHash => false,
            SensitiveDataType::NodePubkey => true,
        };

        if !should_sanitize {
            return original;
        }

        let len = original.len();
        if len <= self.config.partial_show_chars * 2 {
            format!(
                "[REDACTED_{}]",
                self.data_type.display_name().to_uppercase()
            )
        } else {
            let start = &original[..self.config.partial_show_chars];
            let end = &original[len - self.config.partial_show_chars..];
            let middle_len = len - (self.config.partial_show_chars * 2);

            format!(
                "{}[REDACTED_{}_{}_CHARS]{}",
                start,
                self.data_type.display_name().to_uppercase(),
                middle_len,
                end
            )
        }
    }
}

impl<T: fmt::Display> fmt::Display for SensitiveData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sanitized_repr())
    }
}

pub fn sanitize_invoice<T: fmt::Display>(invoice: T) -> SensitiveData<T> {
    SensitiveData::new(invoice, SensitiveDataType::LightningInvoice)
}

pub fn sanitize_preimage<T: fmt::Display>(preimage: T) -> SensitiveData<T> {
    SensitiveData::new(preimage, SensitiveDataType::PaymentPreimage)
}

pub fn sanitize_payment_hash<T: fmt::Display>(hash: T) -> SensitiveData<T> {
    SensitiveData::new(hash, SensitiveDataType::PaymentHash)
}

pub fn sanitize_pubkey<T: fmt::Display>(pubkey: T) -> SensitiveData<T> {
    SensitiveData::new(pubkey, SensitiveDataType::NodePubkey)
}
