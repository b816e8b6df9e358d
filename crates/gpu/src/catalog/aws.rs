//! EC2 GPU and accelerator instance types.
//!
//! Reference: <https://aws.amazon.com/ec2/instance-types/>

use super::{nvme, sku, SkuEntry};

pub(super) const SKUS: &[SkuEntry] = &[
    sku("p2.xlarge", 1, 12, "NVIDIA K80"),
    sku("p2.8xlarge", 8, 96, "NVIDIA K80"),
    sku("p2.16xlarge", 16, 192, "NVIDIA K80"),
    sku("p3.2xlarge", 1, 16, "NVIDIA V100"),
    sku("p3.8xlarge", 4, 64, "NVIDIA V100"),
    sku("p3.16xlarge", 8, 128, "NVIDIA V100"),
    sku("p3dn.24xlarge", 8, 256, "NVIDIA V100"),
    nvme("p4d.24xlarge", 8, 320, "NVIDIA A100"),
    nvme("p4de.24xlarge", 8, 640, "NVIDIA A100"),
    nvme("p5.48xlarge", 8, 640, "NVIDIA H100"),
    nvme("p5e.48xlarge", 8, 1128, "NVIDIA H200"),
    nvme("p5en.48xlarge", 8, 1128, "NVIDIA H200"),
    nvme("g6.xlarge", 1, 24, "NVIDIA L4"),
    nvme("g6.2xlarge", 1, 24, "NVIDIA L4"),
    nvme("g6.4xlarge", 1, 24, "NVIDIA L4"),
    nvme("g6.8xlarge", 1, 24, "NVIDIA L4"),
    nvme("g6.16xlarge", 1, 24, "NVIDIA L4"),
    nvme("gr6.4xlarge", 1, 24, "NVIDIA L4"),
    nvme("gr6.8xlarge", 1, 24, "NVIDIA L4"),
    nvme("g6.12xlarge", 4, 96, "NVIDIA L4"),
    nvme("g6.24xlarge", 4, 96, "NVIDIA L4"),
    nvme("g6.48xlarge", 8, 192, "NVIDIA L4"),
    sku("g5g.xlarge", 1, 16, "NVIDIA T4"),
    sku("g5g.2xlarge", 1, 16, "NVIDIA T4"),
    sku("g5g.4xlarge", 1, 16, "NVIDIA T4"),
    sku("g5g.8xlarge", 1, 16, "NVIDIA T4"),
    sku("g5g.16xlarge", 2, 32, "NVIDIA T4"),
    sku("g5g.metal", 2, 32, "NVIDIA T4"),
    nvme("g5.xlarge", 1, 24, "NVIDIA A10G"),
    nvme("g5.2xlarge", 1, 24, "NVIDIA A10G"),
    nvme("g5.4xlarge", 1, 24, "NVIDIA A10G"),
    nvme("g5.8xlarge", 1, 24, "NVIDIA A10G"),
    nvme("g5.12xlarge", 4, 96, "NVIDIA A10G"),
    nvme("g5.16xlarge", 1, 24, "NVIDIA A10G"),
    nvme("g5.24xlarge", 4, 96, "NVIDIA A10G"),
    nvme("g5.48xlarge", 8, 192, "NVIDIA A10G"),
    nvme("g4dn.xlarge", 1, 16, "NVIDIA T4"),
    nvme("g4dn.2xlarge", 1, 16, "NVIDIA T4"),
    nvme("g4dn.4xlarge", 1, 16, "NVIDIA T4"),
    nvme("g4dn.8xlarge", 1, 16, "NVIDIA T4"),
    nvme("g4dn.16xlarge", 1, 16, "NVIDIA T4"),
    nvme("g4dn.12xlarge", 4, 64, "NVIDIA T4"),
    nvme("g4dn.metal", 8, 128, "NVIDIA T4"),
    nvme("g4ad.xlarge", 1, 8, "AMD Radeon Pro V520"),
    nvme("g4ad.2xlarge", 1, 8, "AMD Radeon Pro V520"),
    nvme("g4ad.4xlarge", 1, 8, "AMD Radeon Pro V520"),
    nvme("g4ad.8xlarge", 2, 16, "AMD Radeon Pro V520"),
    nvme("g4ad.16xlarge", 4, 32, "AMD Radeon Pro V520"),
    sku("g3s.xlarge", 1, 8, "NVIDIA M60"),
    sku("g3s.4xlarge", 1, 8, "NVIDIA M60"),
    sku("g3s.8xlarge", 2, 16, "NVIDIA M60"),
    sku("g3s.16xlarge", 4, 32, "NVIDIA M60"),
    nvme("trn1.2xlarge", 1, 32, "AWS Trainium"),
    nvme("trn1.32xlarge", 16, 512, "AWS Trainium"),
    nvme("trn1n.32xlarge", 16, 512, "AWS Trainium"),
    sku("inf2.xlarge", 1, 32, "AWS Inferentia2"),
    sku("inf2.8xlarge", 1, 32, "AWS Inferentia2"),
    sku("inf2.24xlarge", 6, 192, "AWS Inferentia2"),
    sku("inf2.48xlarge", 12, 384, "AWS Inferentia2"),
];
