//! Native Memory Kernels
//!
//! Element writes at 8..128-bit widths, byte fill and buffer copy. Every
//! kernel is sized adaptively: the buffer starts small and doubles until a
//! timed batch of passes takes longer than the target duration, the next
//! allocation would cross the allocation cap, or allocation fails. The last
//! size that completed is the one reported.

use crate::layer::{MeasurementError, MeasurementLayer};
use crate::measure::{Timer, duration_ms};
use membench_ipc::{DetailedRecord, RecordGrammar, ResultRecord, SummaryRecord};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::hint::black_box;
use std::time::Duration;

/// What a kernel does to its buffer on every pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelKind {
    /// Store the pass number into every element
    ElementWrite,
    /// Byte fill of the whole buffer (memset)
    Fill,
    /// Copy a source buffer into a destination buffer
    Copy,
}

/// Element width a kernel operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementWidth {
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `u128`
    U128,
}

impl ElementWidth {
    /// Size of one element in bytes
    pub fn size_bytes(self) -> u32 {
        match self {
            ElementWidth::U8 => 1,
            ElementWidth::U16 => 2,
            ElementWidth::U32 => 4,
            ElementWidth::U64 => 8,
            ElementWidth::U128 => 16,
        }
    }

    /// Size of one element in bits
    pub fn bits(self) -> u32 {
        self.size_bytes() * 8
    }
}

/// A single test in the native suite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelDef {
    /// Test name reported in the first record field
    pub name: String,
    /// Access pattern
    pub kind: KernelKind,
    /// Element width
    pub element: ElementWidth,
    /// Worker threads sharing the buffer (1 = single-threaded)
    pub threads: usize,
}

impl KernelDef {
    /// Single-threaded element write kernel, named after its width (e.g. `32-bit`)
    pub fn element_write(element: ElementWidth) -> Self {
        Self {
            name: format!("{}-bit", element.bits()),
            kind: KernelKind::ElementWrite,
            element,
            threads: 1,
        }
    }
}

/// Build the default suite for a host with `cores` logical CPUs.
///
/// The all-cores kernels are only present when the core count is known.
pub fn default_catalog(cores: usize) -> Vec<KernelDef> {
    let mut catalog: Vec<KernelDef> = [
        ElementWidth::U8,
        ElementWidth::U16,
        ElementWidth::U32,
        ElementWidth::U64,
        ElementWidth::U128,
    ]
    .into_iter()
    .map(KernelDef::element_write)
    .collect();

    catalog.push(KernelDef {
        name: "copy".to_string(),
        kind: KernelKind::Copy,
        element: ElementWidth::U64,
        threads: 1,
    });

    if cores > 0 {
        catalog.push(KernelDef {
            name: format!("128-bit ({} thr)", cores),
            kind: KernelKind::ElementWrite,
            element: ElementWidth::U128,
            threads: cores,
        });
        catalog.push(KernelDef {
            name: format!("memset ({} thr)", cores),
            kind: KernelKind::Fill,
            element: ElementWidth::U8,
            threads: cores,
        });
    }

    catalog
}

/// Sizing parameters shared by every kernel
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Element count of the first attempt
    pub initial_elements: u64,
    /// Largest buffer (in bytes) a kernel may allocate
    pub max_allocation_bytes: u64,
    /// Stop growing once a timed batch takes longer than this
    pub target_duration: Duration,
    /// Passes over the buffer per timed batch
    pub repetitions: u32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            initial_elements: 1024,
            max_allocation_bytes: 1024 * 1024 * 1024, // 1 GiB
            target_duration: Duration::from_millis(100),
            repetitions: 10,
        }
    }
}

/// Values a kernel can store; the pass number is truncated to the width.
pub trait Element: Copy + Default + Send + Sync + 'static {
    /// Value written on pass `pass`
    fn from_pass(pass: u32) -> Self;
}

macro_rules! impl_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                #[inline(always)]
                fn from_pass(pass: u32) -> Self {
                    pass as $t
                }
            }
        )*
    };
}

impl_element!(u8, u16, u32, u64, u128);

/// In-process measurement layer backed by the native kernels
pub struct NativeKernels {
    catalog: Vec<KernelDef>,
    config: KernelConfig,
    grammar: RecordGrammar,
}

impl NativeKernels {
    /// Create a measurement layer over `catalog`, emitting `grammar` records
    pub fn new(catalog: Vec<KernelDef>, config: KernelConfig, grammar: RecordGrammar) -> Self {
        Self {
            catalog,
            config,
            grammar,
        }
    }

    /// The kernels this layer runs, in suite order
    pub fn catalog(&self) -> &[KernelDef] {
        &self.catalog
    }

    /// Run one kernel through the sizing loop
    pub fn measure(&self, def: &KernelDef) -> Result<DetailedRecord, MeasurementError> {
        let pool = if def.threads > 1 {
            Some(
                ThreadPoolBuilder::new()
                    .num_threads(def.threads)
                    .thread_name(|i| format!("membench-kernel-{}", i))
                    .build()
                    .map_err(|e| {
                        MeasurementError::Unavailable(format!("failed to build kernel pool: {}", e))
                    })?,
            )
        } else {
            None
        };
        let pool = pool.as_ref();
        let cfg = &self.config;

        let sized = match (def.kind, def.element) {
            (KernelKind::Copy, _) => run_copy(cfg),
            (KernelKind::Fill, _) => run_sized::<u8>(cfg, def.threads, pool, fill_pass),
            (KernelKind::ElementWrite, ElementWidth::U8) => {
                run_sized::<u8>(cfg, def.threads, pool, write_pass::<u8>)
            }
            (KernelKind::ElementWrite, ElementWidth::U16) => {
                run_sized::<u16>(cfg, def.threads, pool, write_pass::<u16>)
            }
            (KernelKind::ElementWrite, ElementWidth::U32) => {
                run_sized::<u32>(cfg, def.threads, pool, write_pass::<u32>)
            }
            (KernelKind::ElementWrite, ElementWidth::U64) => {
                run_sized::<u64>(cfg, def.threads, pool, write_pass::<u64>)
            }
            (KernelKind::ElementWrite, ElementWidth::U128) => {
                run_sized::<u128>(cfg, def.threads, pool, write_pass::<u128>)
            }
        };

        let (num_elements, duration) = sized.unwrap_or((0, Duration::ZERO));
        if num_elements == 0 {
            tracing::warn!(kernel = %def.name, "no buffer size completed a timed batch");
        }

        Ok(DetailedRecord {
            test_name: def.name.clone(),
            num_elements,
            element_size: def.element.size_bytes(),
            duration_ms: duration_ms(duration),
            repetitions: cfg.repetitions,
        })
    }
}

impl MeasurementLayer for NativeKernels {
    fn test_count(&mut self) -> Result<usize, MeasurementError> {
        Ok(self.catalog.len())
    }

    fn run_one_test(&mut self, index: usize) -> Result<String, MeasurementError> {
        let def = self
            .catalog
            .get(index)
            .ok_or(MeasurementError::IndexOutOfRange {
                index,
                count: self.catalog.len(),
            })?;

        let measured = self.measure(def)?;
        tracing::debug!(
            kernel = %def.name,
            elements = measured.num_elements,
            duration_ms = measured.duration_ms,
            "kernel measured"
        );

        Ok(encode(measured, self.grammar).to_string())
    }
}

/// Express a raw measurement in the requested grammar.
///
/// The summary grammar carries throughput and bandwidth computed here; a
/// kernel that never completed a batch reports zeros.
pub fn encode(measured: DetailedRecord, grammar: RecordGrammar) -> ResultRecord {
    match grammar {
        RecordGrammar::Detailed => ResultRecord::Detailed(measured),
        RecordGrammar::Summary => {
            let (elements_per_second, bandwidth_mbps) =
                if measured.num_elements == 0 || measured.duration_ms <= 0.0 {
                    (0.0, 0.0)
                } else {
                    let seconds = measured.duration_ms / 1000.0;
                    let elements = measured.num_elements as f64 * measured.repetitions as f64;
                    let bytes = elements * measured.element_size as f64;
                    (elements / seconds, bytes / (1024.0 * 1024.0) / seconds)
                };
            ResultRecord::Summary(SummaryRecord {
                test_name: measured.test_name,
                elements_per_second,
                bandwidth_mbps,
            })
        }
    }
}

/// Grow the element count until a stop condition hits.
///
/// `timed` allocates `n` elements and runs one timed batch, returning `None`
/// when the allocation fails. Returns the last `(elements, duration)` that
/// completed.
fn size_up(
    config: &KernelConfig,
    bytes_per_element: u64,
    mut timed: impl FnMut(usize) -> Option<Duration>,
) -> Option<(u64, Duration)> {
    let mut num_elements = config.initial_elements.max(1);
    let mut last = None;

    loop {
        if num_elements.saturating_mul(bytes_per_element) > config.max_allocation_bytes {
            break;
        }
        let Ok(len) = usize::try_from(num_elements) else {
            break;
        };
        let Some(elapsed) = timed(len) else {
            tracing::debug!(elements = num_elements, "allocation failed");
            break;
        };

        tracing::trace!(
            elements = num_elements,
            duration_ms = duration_ms(elapsed),
            "timed batch"
        );
        last = Some((num_elements, elapsed));

        if elapsed > config.target_duration {
            break;
        }
        num_elements = num_elements.saturating_mul(2);
    }

    last
}

/// Fallible allocation; the zero fill doubles as the warm-up pass.
fn try_alloc<T: Element>(len: usize) -> Option<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).ok()?;
    data.resize(len, T::default());
    Some(data)
}

fn run_sized<T: Element>(
    config: &KernelConfig,
    threads: usize,
    pool: Option<&ThreadPool>,
    pass: fn(&mut [T], u32),
) -> Option<(u64, Duration)> {
    let bytes_per_element = std::mem::size_of::<T>() as u64;
    size_up(config, bytes_per_element, |len| {
        let mut data = try_alloc::<T>(len)?;

        let timer = Timer::start();
        match pool {
            Some(pool) => run_chunked(pool, &mut data, threads, config.repetitions, pass),
            None => pass(&mut data, config.repetitions),
        }
        let elapsed = timer.stop();

        black_box(&data);
        Some(elapsed)
    })
}

fn run_copy(config: &KernelConfig) -> Option<(u64, Duration)> {
    // Source and destination both count against the allocation cap
    let bytes_per_element = 2 * std::mem::size_of::<u64>() as u64;
    size_up(config, bytes_per_element, |len| {
        let mut src = try_alloc::<u64>(len)?;
        let mut dst = try_alloc::<u64>(len)?;
        for (i, v) in src.iter_mut().enumerate() {
            *v = i as u64;
        }

        let timer = Timer::start();
        for _ in 0..config.repetitions {
            dst.copy_from_slice(&src);
            black_box(&mut dst);
        }
        let elapsed = timer.stop();

        black_box(&dst);
        Some(elapsed)
    })
}

fn write_pass<T: Element>(data: &mut [T], repetitions: u32) {
    for rep in 0..repetitions {
        let value = T::from_pass(rep);
        for slot in data.iter_mut() {
            *slot = value;
        }
        black_box(&mut *data);
    }
}

fn fill_pass(data: &mut [u8], repetitions: u32) {
    for rep in 0..repetitions {
        data.fill(rep as u8);
        black_box(&mut *data);
    }
}

/// Split the buffer into one contiguous chunk per thread and run the pass
/// on every chunk concurrently. The last chunk takes the remainder.
fn run_chunked<T: Element>(
    pool: &ThreadPool,
    data: &mut [T],
    parts: usize,
    repetitions: u32,
    pass: fn(&mut [T], u32),
) {
    let chunks = split_chunks(data, parts);
    pool.scope(|s| {
        for chunk in chunks {
            s.spawn(move |_| pass(chunk, repetitions));
        }
    });
}

fn split_chunks<T>(mut data: &mut [T], parts: usize) -> Vec<&mut [T]> {
    let parts = parts.max(1);
    let chunk_len = data.len() / parts;
    let mut chunks = Vec::with_capacity(parts);

    for _ in 1..parts {
        let (head, tail) = std::mem::take(&mut data).split_at_mut(chunk_len);
        chunks.push(head);
        data = tail;
    }
    chunks.push(data);

    chunks
}
