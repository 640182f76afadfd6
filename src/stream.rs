use std::io::{self, Read, Write};

use crate::config::LOSS_STREAM_ID;
use crate::error::{GulError, GulResult};
use crate::sampler::ItemLoss;
use crate::types::{EventId, ItemId, SampleIndex};

/// Writes the binary ground-up loss stream. All words are little-endian:
///
/// ```text
/// header:  i32 stream id = (2 << 24) | 1
///          i32 number_of_samples
/// body:    per (event, item) group
///            i32 event_id, i32 item_id
///            per sample: i32 sidx, f32 loss
///            i32 0, f32 0.0          group terminator
/// ```
pub struct LossStreamWriter<W: Write> {
    sink: W,
    groups: usize,
}

impl<W: Write> LossStreamWriter<W> {
    /// Writes the stream header.
    pub fn new(mut sink: W, number_of_samples: u32) -> GulResult<Self> {
        sink.write_all(&LOSS_STREAM_ID.to_le_bytes())?;
        sink.write_all(&(number_of_samples as i32).to_le_bytes())?;
        Ok(LossStreamWriter { sink, groups: 0 })
    }

    pub fn write_item(&mut self, item: &ItemLoss) -> GulResult<()> {
        self.sink.write_all(&item.event_id.0.to_le_bytes())?;
        self.sink.write_all(&item.item_id.0.to_le_bytes())?;
        for sample in &item.samples {
            self.write_pair(sample.sidx.to_wire(), sample.loss as f32)?;
        }
        self.write_pair(0, 0.0)?;
        self.groups += 1;
        Ok(())
    }

    fn write_pair(&mut self, sidx: i32, loss: f32) -> GulResult<()> {
        self.sink.write_all(&sidx.to_le_bytes())?;
        self.sink.write_all(&loss.to_le_bytes())?;
        Ok(())
    }

    pub fn groups_written(&self) -> usize {
        self.groups
    }

    /// Flushes and hands the sink back to the caller, who closes it.
    pub fn finish(mut self) -> GulResult<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub stream_id: i32,
    pub number_of_samples: i32,
}

/// One decoded loss record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossRecord {
    pub event_id: EventId,
    pub item_id: ItemId,
    pub sidx: SampleIndex,
    pub loss: f32,
}

pub struct LossStreamReader<R: Read> {
    source: R,
    header: StreamHeader,
}

impl<R: Read> LossStreamReader<R> {
    /// Reads and checks the header.
    pub fn new(mut source: R) -> GulResult<Self> {
        let stream_id = read_i32(&mut source)?;
        if stream_id != LOSS_STREAM_ID {
            return Err(GulError::StreamId { found: stream_id, expected: LOSS_STREAM_ID });
        }
        let number_of_samples = read_i32(&mut source)?;
        Ok(LossStreamReader {
            source,
            header: StreamHeader { stream_id, number_of_samples },
        })
    }

    pub fn header(&self) -> StreamHeader {
        self.header
    }

    /// Next (event, item) group, or `None` at a clean end of stream.
    pub fn next_group(&mut self) -> GulResult<Option<Vec<LossRecord>>> {
        let mut first = [0u8; 4];
        let mut filled = 0;
        while filled < first.len() {
            match self.source.read(&mut first[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        let event_id = EventId(i32::from_le_bytes(first));
        let item_id = ItemId(read_i32(&mut self.source)?);

        let mut records = Vec::new();
        loop {
            let sidx = read_i32(&mut self.source)?;
            let loss = f32::from_le_bytes(read_word(&mut self.source)?);
            if sidx == 0 {
                break;
            }
            let sidx = SampleIndex::from_wire(sidx).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, format!("undefined sidx {sidx}"))
            })?;
            records.push(LossRecord { event_id, item_id, sidx, loss });
        }
        Ok(Some(records))
    }

    /// Every remaining record, in stream order.
    pub fn read_all(mut self) -> GulResult<Vec<LossRecord>> {
        let mut out = Vec::new();
        while let Some(group) = self.next_group()? {
            out.extend(group);
        }
        Ok(out)
    }
}

fn read_word(source: &mut impl Read) -> io::Result<[u8; 4]> {
    let mut buf = [0u8; 4];
    source.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_i32(source: &mut impl Read) -> io::Result<i32> {
    read_word(source).map(i32::from_le_bytes)
}
