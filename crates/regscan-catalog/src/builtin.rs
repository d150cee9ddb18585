//! Built-in MIMXRT700 peripheral catalog.

use crate::catalog::{PeripheralCatalog, PeripheralDefinition};

pub const RSTCTL0_BASE: u64 = 0x4000_0000;
pub const CLKCTL0_BASE: u64 = 0x4000_1000;
pub const IOPCTL0_BASE: u64 = 0x4000_4000;
pub const IOPCTL1_BASE: u64 = 0x4006_4000;
pub const IOPCTL2_BASE: u64 = 0x400A_5000;
pub const GPIO0_BASE: u64 = 0x4010_0000;
pub const XCACHE0_BASE: u64 = 0x4018_0000;
pub const XCACHE1_BASE: u64 = 0x4019_0000;
pub const XSPI2_BASE: u64 = 0x4041_1000;
pub const MPU_BASE: u64 = 0xE000_ED90;

/// Byte stride between IOPCTL ports.
pub const IOPCTL_PORT_STRIDE: u64 = 0x80;
/// Pins per IOPCTL port.
pub const IOPCTL_PINS_PER_PORT: u32 = 32;

/// IOPCTL instances: (name, base, first port, last port).
pub const IOPCTL_BANKS: &[(&str, u64, u32, u32)] = &[
    ("IOPCTL0", IOPCTL0_BASE, 0, 7),
    ("IOPCTL1", IOPCTL1_BASE, 8, 10),
    ("IOPCTL2", IOPCTL2_BASE, 11, 11),
];

const XSPI_REGS: &[(u64, &str)] = &[
    (0x000, "MCR"),
    (0x008, "IPCR"),
    (0x00C, "FLSHCR"),
    (0x010, "BUFCR0"),
    (0x014, "BUFCR1"),
    (0x018, "BUFCR2"),
    (0x01C, "BUFCR3"),
    (0x020, "BFGENCR"),
    (0x024, "SOCCR"),
    (0x100, "SFAR"),
    (0x104, "SFACR"),
    (0x108, "SMPR"),
    (0x300, "LUTKEY"),
    (0x304, "LCKCR"),
];

const XSPI_MEMBERS: &[(u32, &str)] = &[
    (0, "MCR"),
    (1, "IPCR"),
    (2, "FLSHCR"),
    (4, "BUFCR0"),
    (5, "AHBCR"),
    (8, "AHBRXBUF0CR"),
    (10, "AHBRXBUF1CR"),
    (12, "FLSHA1CR0"),
    (16, "FLSHA2CR0"),
    (22, "FLSHB1CR0"),
    (27, "IPCMD"),
    (28, "IPCR1"),
    (29, "IPCR2"),
    (30, "IPCR3"),
    (32, "AHBSPNDSTS"),
    (33, "IPRXFCR"),
    (40, "IPTXFCR"),
    (41, "LUTKEY"),
    (42, "LCKCR"),
    (44, "LUT0"),
    (46, "AHBRXBUF0CR0"),
    (47, "AHBRXBUF1CR0"),
    (48, "AHBRXBUF2CR0"),
    (51, "AHBRXBUF0CR1"),
    (52, "AHBRXBUF1CR1"),
    (53, "AHBRXBUF2CR1"),
    (54, "AHBRXBUF0CR2"),
    (55, "AHBRXBUF1CR2"),
    (56, "AHBRXBUF2CR2"),
    (57, "AHBRXBUF0CR3"),
    (124, "STS0"),
    (125, "STS1"),
    (133, "INTR"),
    (134, "INTEN"),
];

const GPIO_REGS: &[(u64, &str)] = &[
    (0x00, "PDOR"),
    (0x04, "PSOR"),
    (0x08, "PCOR"),
    (0x0C, "PTOR"),
    (0x10, "PDIR"),
    (0x14, "PDDR"),
    (0x18, "PIDR"),
];

const CLKCTL0_REGS: &[(u64, &str)] = &[
    (0x00, "PSCCTL0"),
    (0x04, "PSCCTL1"),
    (0x08, "PSCCTL2"),
    (0x10, "AUTOCLKGATEOVERRIDE"),
    (0x20, "CLOCKGENUPDATELOCKOUT"),
    (0x30, "SYSTEMCLKDIV"),
    (0x40, "AHBCLKDIV"),
    (0x70, "MAINCLKSELA"),
    (0x74, "MAINCLKSELB"),
    (0x80, "CLKOUTSEL"),
];

const CLKCTL1_REGS: &[(u64, &str)] = &[
    (0x00, "PSCCTL0"),
    (0x04, "PSCCTL1"),
    (0x08, "PSCCTL2"),
    (0x0C, "PSCCTL3"),
    (0x10, "PSCCTL4"),
];

const SYSCON0_REGS: &[(u64, &str)] = &[
    (0x00, "AHBMATPRIO"),
    (0x10, "SYSTCKCAL"),
    (0x20, "NMISRC"),
    (0x24, "ASYNCAPBCTRL"),
    (0x30, "PIOPORCAP0"),
    (0x34, "PIOPORCAP1"),
    (0x40, "PIORESCAP0"),
    (0x44, "PIORESCAP1"),
    (0x50, "PRESETCTRL0"),
    (0x54, "PRESETCTRL1"),
    (0x58, "PRESETCTRL2"),
];

const SYSCON3_REGS: &[(u64, &str)] = &[
    (0x0, "SILICONREV_ID"),
    (0x4, "DEVICE_ID0"),
    (0x8, "DEVICE_ID1"),
    (0xC, "DEVICE_ID2"),
];

const RSTCTL_REGS: &[(u64, &str)] = &[
    (0x00, "PRSTCTL0"),
    (0x04, "PRSTCTL1"),
    (0x08, "PRSTCTL2"),
    (0x0C, "PRSTCTL3"),
    (0x10, "PRSTCTL4"),
    (0x20, "PRSTCTLSET0"),
    (0x24, "PRSTCTLSET1"),
    (0x28, "PRSTCTLSET2"),
    (0x2C, "PRSTCTLSET3"),
    (0x30, "PRSTCTLSET4"),
    (0x40, "PRSTCTLCLR0"),
    (0x44, "PRSTCTLCLR1"),
    (0x48, "PRSTCTLCLR2"),
    (0x4C, "PRSTCTLCLR3"),
    (0x50, "PRSTCTLCLR4"),
];

const LP_FLEXCOMM_REGS: &[(u64, &str)] = &[
    (0x00, "VERID"),
    (0x04, "PARAM"),
    (0x08, "GLOBAL"),
    (0x0C, "PINCFG"),
    (0x10, "BAUD"),
    (0x14, "STAT"),
    (0x18, "CTRL"),
    (0x1C, "DATA"),
    (0x20, "MATCH"),
    (0x24, "MODIR"),
    (0x28, "FIFO"),
    (0x2C, "WATER"),
];

const DMA_REGS: &[(u64, &str)] = &[
    (0x000, "CTRL"),
    (0x004, "INTSTAT"),
    (0x008, "SRAMBASE"),
    (0x100, "ENABLESET0"),
    (0x104, "ENABLECLR0"),
    (0x108, "ACTIVE0"),
    (0x10C, "BUSY0"),
    (0x110, "ERRINT0"),
    (0x114, "INTENSET0"),
    (0x118, "INTENCLR0"),
    (0x11C, "INTA0"),
    (0x120, "INTB0"),
];

const CTIMER_REGS: &[(u64, &str)] = &[
    (0x00, "IR"),
    (0x04, "TCR"),
    (0x08, "TC"),
    (0x0C, "PR"),
    (0x10, "PC"),
    (0x14, "MCR"),
    (0x18, "MR0"),
    (0x1C, "MR1"),
    (0x20, "MR2"),
    (0x24, "MR3"),
    (0x28, "CCR"),
    (0x2C, "CR0"),
    (0x30, "CR1"),
];

const ADC_REGS: &[(u64, &str)] = &[
    (0x000, "VERID"),
    (0x004, "PARAM"),
    (0x008, "CTRL"),
    (0x00C, "STAT"),
    (0x010, "IE"),
    (0x014, "DE"),
    (0x018, "CFG"),
    (0x01C, "PAUSE"),
    (0x020, "SWTRIG"),
    (0x024, "TSTAT"),
    (0x040, "OFSTRIM"),
    (0x100, "TCTRL0"),
    (0x104, "TCTRL1"),
    (0x200, "FCTRL0"),
    (0x204, "FCTRL1"),
    (0x300, "GCC0"),
    (0x304, "GCC1"),
    (0x400, "GCR0"),
    (0x404, "GCR1"),
];

const USB_REGS: &[(u64, &str)] = &[
    (0x000, "GPTIMER0LD"),
    (0x004, "GPTIMER0CTRL"),
    (0x008, "GPTIMER1LD"),
    (0x00C, "GPTIMER1CTRL"),
    (0x010, "SBUSCFG"),
    (0x080, "HCIVERSION"),
    (0x084, "HCSPARAMS"),
    (0x088, "HCCPARAMS"),
    (0x100, "DCIVERSION"),
    (0x104, "DCCPARAMS"),
    (0x140, "USBCMD"),
    (0x144, "USBSTS"),
    (0x148, "USBINTR"),
    (0x14C, "FRINDEX"),
];

const CRC_REGS: &[(u64, &str)] = &[(0x0, "MODE"), (0x4, "SEED"), (0x8, "SUM"), (0xC, "WR_DATA")];

const TRNG_REGS: &[(u64, &str)] = &[
    (0x00, "MCTL"),
    (0x04, "SCMISC"),
    (0x08, "PKRRNG"),
    (0x0C, "PKRMAX"),
    (0x10, "PKRSQ"),
    (0x14, "SDCTL"),
    (0x18, "SBLIM"),
    (0x1C, "TOTSAM"),
    (0x20, "FRQMIN"),
    (0x24, "FRQCNT"),
    (0x28, "FRQMAX"),
    (0x2C, "SCMC"),
    (0x30, "SCML"),
    (0x34, "SCR1C"),
    (0x38, "SCR1L"),
];

const GLIKEY_REGS: &[(u64, &str)] = &[
    (0x00, "GLIKEY0"),
    (0x04, "GLIKEY1"),
    (0x08, "GLIKEY2"),
    (0x0C, "GLIKEY3"),
    (0x10, "GLIKEY4"),
    (0x14, "GLIKEY5"),
    (0x18, "GLIKEY6"),
    (0x1C, "GLIKEY7"),
];

const AHBSC_REGS: &[(u64, &str)] = &[
    (0x000, "MISC_CTRL_DP_REG"),
    (0x004, "MISC_CTRL_REG"),
    (0x100, "COMPUTE_ARB0RAM_ACCESS_ENABLE"),
    (0x104, "SENSE_ARB0RAM_ACCESS_ENABLE"),
    (0x108, "MEDIA_ARB0RAM_ACCESS_ENABLE"),
    (0x10C, "NPU_ARB0RAM_ACCESS_ENABLE"),
    (0x110, "HIFI4_ARB0RAM_ACCESS_ENABLE"),
];

const CACHE_REGS: &[(u64, &str)] = &[
    (0x00, "CCR"),
    (0x04, "CLCR"),
    (0x08, "CSAR"),
    (0x0C, "CCVR"),
    (0x10, "CRMR"),
];

/// Cortex-M MPU registers, relative to `MPU_TYPE` at 0xE000ED90.
const MPU_REGS: &[(u64, &str)] = &[
    (0x00, "TYPE"),
    (0x04, "CTRL"),
    (0x08, "RNR"),
    (0x0C, "RBAR"),
    (0x10, "RLAR"),
    (0x30, "MAIR0"),
    (0x34, "MAIR1"),
];

/// Fixed-layout peripherals in catalog order; IOPCTL blocks are generated.
const PERIPHERALS: &[(&str, u64, &[(u64, &str)])] = &[
    ("XSPI0", 0x5018_4000, XSPI_REGS),
    ("XSPI0_NS", 0x4018_4000, XSPI_REGS),
    ("XSPI1", 0x4018_5000, XSPI_REGS),
    ("XSPI2", XSPI2_BASE, XSPI_REGS),
    ("GPIO0", GPIO0_BASE, GPIO_REGS),
    ("GPIO1", 0x4010_2000, GPIO_REGS),
    ("GPIO2", 0x4010_4000, GPIO_REGS),
    ("GPIO3", 0x4010_6000, GPIO_REGS),
    ("CLKCTL0", CLKCTL0_BASE, CLKCTL0_REGS),
    ("SYSCON0", 0x4000_2000, SYSCON0_REGS),
    ("LP_FLEXCOMM0", 0x4011_0000, LP_FLEXCOMM_REGS),
    ("LP_FLEXCOMM1", 0x4011_1000, LP_FLEXCOMM_REGS),
    ("DMA0", 0x4014_0000, DMA_REGS),
    ("DMA1", 0x4016_0000, DMA_REGS),
    ("CTIMER0", 0x4002_8000, CTIMER_REGS),
    ("ADC0", 0x4020_C000, ADC_REGS),
    ("USB0", 0x4041_8000, USB_REGS),
    ("CRC", 0x4015_1000, CRC_REGS),
    ("TRNG", 0x4018_7000, TRNG_REGS),
    ("CLKCTL1", 0x4000_3000, CLKCTL1_REGS),
    ("RSTCTL0", RSTCTL0_BASE, RSTCTL_REGS),
    ("RSTCTL1", 0x4000_5000, RSTCTL_REGS),
    ("GLIKEY", 0x4000_8000, GLIKEY_REGS),
    ("AHBSC0", 0x4000_9000, AHBSC_REGS),
    ("CACHE64_CTRL0", 0x4017_0000, CACHE_REGS),
    ("CACHE64_CTRL1", 0x4017_1000, CACHE_REGS),
    ("XCACHE0", XCACHE0_BASE, CACHE_REGS),
    ("XCACHE1", XCACHE1_BASE, CACHE_REGS),
    ("SYSCON3", 0x4000_7000, SYSCON3_REGS),
    ("MPU", MPU_BASE, MPU_REGS),
];

/// Register name of an IOPCTL pin control register.
pub fn iopctl_register_name(port: u32, pin: u32) -> String {
    format!("PIO{port}_{pin}")
}

fn iopctl_definition(name: &str, base: u64, first: u32, last: u32) -> PeripheralDefinition {
    let mut def = PeripheralDefinition::new(name, base);
    for port in first..=last {
        for pin in 0..IOPCTL_PINS_PER_PORT {
            let offset = u64::from(port - first) * IOPCTL_PORT_STRIDE + u64::from(pin) * 4;
            def = def.with_register(offset, iopctl_register_name(port, pin));
        }
    }
    def
}

impl PeripheralCatalog {
    /// Built-in MIMXRT700 catalog.
    pub fn mimxrt700() -> Self {
        let mut defs: Vec<PeripheralDefinition> = PERIPHERALS
            .iter()
            .map(|&(name, base, regs)| {
                regs.iter()
                    .fold(PeripheralDefinition::new(name, base), |def, &(offset, reg)| {
                        def.with_register(offset, reg)
                    })
            })
            .collect();

        let iopctl_at = defs
            .iter()
            .position(|d| d.name == "RSTCTL1")
            .map_or(defs.len(), |i| i + 1);
        for (k, &(name, base, first, last)) in IOPCTL_BANKS.iter().enumerate() {
            defs.insert(iopctl_at + k, iopctl_definition(name, base, first, last));
        }

        if let Some(xspi2) = defs.iter_mut().find(|d| d.name == "XSPI2") {
            for &(idx, reg) in XSPI_MEMBERS {
                xspi2.members.insert(idx, reg.to_string());
            }
        }

        Self::from_definitions(defs)
    }
}
