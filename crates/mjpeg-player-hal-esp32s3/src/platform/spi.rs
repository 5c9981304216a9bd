use embedded_hal::{
    digital::OutputPin,
    spi::{Error as SpiErrorTrait, ErrorKind, ErrorType, Operation, SpiBus, SpiDevice},
};

#[derive(Debug)]
pub enum OwnedSpiError<BusErr, CsErr>
where
    BusErr: core::fmt::Debug,
    CsErr: core::fmt::Debug,
{
    Bus(BusErr),
    Cs(CsErr),
    DelayNotSupported,
}

impl<BusErr, CsErr> SpiErrorTrait for OwnedSpiError<BusErr, CsErr>
where
    BusErr: core::fmt::Debug,
    CsErr: core::fmt::Debug,
{
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Sole user of a SPI bus: drives its own chip select around each
/// transaction.
#[derive(Debug)]
pub struct OwnedSpiDevice<BUS, CS> {
    bus: BUS,
    cs: CS,
}

impl<BUS, CS> OwnedSpiDevice<BUS, CS>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
{
    /// Takes the bus with CS deasserted.
    pub fn new(bus: BUS, mut cs: CS) -> Result<Self, CS::Error> {
        cs.set_high()?;
        Ok(Self { bus, cs })
    }

    /// Clocks idle bytes with CS deasserted (SD cards need >= 74 clocks
    /// before their first command).
    pub fn preclock(&mut self, bytes: usize) -> Result<(), BUS::Error> {
        let idle = [0xFFu8; 16];
        let mut remaining = bytes;
        while remaining > 0 {
            let n = remaining.min(idle.len());
            self.bus.write(&idle[..n])?;
            remaining -= n;
        }
        self.bus.flush()
    }

    /// Raw bus access, for clock changes between transactions.
    pub fn bus_mut(&mut self) -> &mut BUS {
        &mut self.bus
    }

    pub fn release(self) -> (BUS, CS) {
        (self.bus, self.cs)
    }
}

impl<BUS, CS> ErrorType for OwnedSpiDevice<BUS, CS>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
    BUS::Error: core::fmt::Debug,
    CS::Error: core::fmt::Debug,
{
    type Error = OwnedSpiError<BUS::Error, CS::Error>;
}

impl<BUS, CS> SpiDevice<u8> for OwnedSpiDevice<BUS, CS>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
    BUS::Error: core::fmt::Debug,
    CS::Error: core::fmt::Debug,
{
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        if operations
            .iter()
            .any(|op| matches!(op, Operation::DelayNs(_)))
        {
            return Err(OwnedSpiError::DelayNotSupported);
        }

        self.cs.set_low().map_err(OwnedSpiError::Cs)?;

        let op_result = (|| {
            for operation in operations {
                match operation {
                    Operation::Read(buf) => self.bus.read(buf).map_err(OwnedSpiError::Bus)?,
                    Operation::Write(buf) => self.bus.write(buf).map_err(OwnedSpiError::Bus)?,
                    Operation::Transfer(read, write) => self
                        .bus
                        .transfer(read, write)
                        .map_err(OwnedSpiError::Bus)?,
                    Operation::TransferInPlace(buf) => self
                        .bus
                        .transfer_in_place(buf)
                        .map_err(OwnedSpiError::Bus)?,
                    Operation::DelayNs(_) => return Err(OwnedSpiError::DelayNotSupported),
                }
            }
            self.bus.flush().map_err(OwnedSpiError::Bus)?;
            Ok(())
        })();

        let cs_result = self.cs.set_high().map_err(OwnedSpiError::Cs);
        op_result.and(cs_result)
    }
}
