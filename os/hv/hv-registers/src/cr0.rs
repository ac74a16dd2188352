use bitfield_struct::bitfield;

/// Architectural model of CR0 as seen by a guest.
///
/// All architecturally defined control bits are exposed as booleans;
/// reserved bits are forced to 0.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct Cr0 {
    /// Bit 0: Protection Enable (PE).
    pub pe_protection_enable: bool,

    /// Bit 1: Monitor Coprocessor (MP).
    pub mp_monitor_coprocessor: bool,

    /// Bit 2: Emulation (EM). No x87 present when set.
    pub em_emulation: bool,

    /// Bit 3: Task Switched (TS).
    pub ts_task_switched: bool,

    /// Bit 4: Extension Type (ET). Hardwired to 1 on anything newer than a 386.
    pub et_extension_type: bool,

    /// Bit 5: Numeric Error (NE). x87 errors raise #MF instead of IRQ 13.
    pub ne_numeric_error: bool,

    #[bits(10, default = 0)]
    _reserved_6_15: u16,

    /// Bit 16: Write Protect (WP).
    pub wp_write_protect: bool,

    #[bits(default = 0)]
    _reserved_17: bool,

    /// Bit 18: Alignment Mask (AM).
    pub am_alignment_mask: bool,

    #[bits(10, default = 0)]
    _reserved_19_28: u16,

    /// Bit 29: Not-Write-Through (NW).
    pub nw_not_write_through: bool,

    /// Bit 30: Cache Disable (CD).
    pub cd_cache_disable: bool,

    /// Bit 31: Paging (PG). Requires PE.
    pub pg_paging: bool,

    #[bits(32, default = 0)]
    _reserved_32_63: u32,
}

impl Cr0 {
    /// Unpaged protected mode with native x87 error reporting: `PE | ET | NE`.
    #[must_use]
    pub const fn protected_mode_boot() -> Self {
        Self::new()
            .with_pe_protection_enable(true)
            .with_et_extension_type(true)
            .with_ne_numeric_error(true)
    }
}
