use crate::domain::profile::ProvisionedProfile;
use crate::error::Result;
use std::io::Write;

/// Writes provisioned profiles as pretty-printed JSON.
pub struct ProfileWriter<W: Write> {
    writer: W,
}

impl<W: Write> ProfileWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_profile(&mut self, profile: &ProvisionedProfile) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, profile)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}
